use std::process::Command;

fn main() {
    // Capture the toolchain version for the Datadog-Meta-Lang-Version
    // request header.
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|version| version.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=DATADOG_TRACER_RUSTC_VERSION={version}");
}
