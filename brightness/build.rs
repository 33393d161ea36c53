//! Build script for brightkit-brightness.

fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    if target_os == "ios" {
        use brightkit_build::AppleSwiftConfig;

        let config = AppleSwiftConfig::new("brightkit-brightness", "BrightnessHelper")
            .swift_source("src/sys/apple/Brightness.swift")
            .framework("UIKit");

        brightkit_build::compile_swift("src/sys/apple/mod.rs", &config);
    }

    if target_os == "android" {
        brightkit_build::build_kotlin(&["src/sys/android/BrightnessObserver.kt"]);
    }
}
