fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fall back to the bundled protoc when the host does not provide one.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
        std::env::set_var("PROTOC", protoc);
    }

    println!("cargo:rerun-if-changed=../protos/coordinator.proto");
    tonic_build::compile_protos("../protos/coordinator.proto")?;
    Ok(())
}
