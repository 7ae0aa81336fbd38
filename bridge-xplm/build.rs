//! Link setup for the XPLM SDK.
//!
//! Only active with the `link-xplm` feature. Set `XPLM_SDK_PATH` to the SDK
//! root (the directory containing `Libraries/`). Linux plugins resolve the
//! XPLM symbols from the host process at load time and need nothing here.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=XPLM_SDK_PATH");

    if env::var_os("CARGO_FEATURE_LINK_XPLM").is_none() {
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let sdk = env::var_os("XPLM_SDK_PATH").map(PathBuf::from);

    match (target_os.as_str(), sdk) {
        ("windows", Some(sdk)) => {
            let libs = sdk.join("Libraries").join("Win");
            println!("cargo:rustc-link-search=native={}", libs.display());
            println!("cargo:rustc-link-lib=dylib=XPLM_64");
        }
        ("macos", Some(sdk)) => {
            let libs = sdk.join("Libraries").join("Mac");
            println!("cargo:rustc-link-search=framework={}", libs.display());
            println!("cargo:rustc-link-lib=framework=XPLM");
        }
        ("macos", None) => {
            println!("cargo:rustc-cdylib-link-arg=-undefined");
            println!("cargo:rustc-cdylib-link-arg=dynamic_lookup");
        }
        ("windows", None) => {
            println!("cargo:warning=XPLM_SDK_PATH is not set; linking XPLM_64 will fail");
        }
        _ => {}
    }
}
