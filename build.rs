// build.rs

use std::env;

fn main() {
    let version = env::var("RETROLINK_VERSION")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "dev".to_string()));

    println!("cargo:rustc-env=RETROLINK_BUILD_VERSION={version}");
    println!("cargo:rerun-if-env-changed=RETROLINK_VERSION");
}
