//! Apple platform build utilities.

use std::path::PathBuf;

/// Configuration for Swift compilation.
#[derive(Debug, Clone)]
pub struct AppleSwiftConfig {
    /// The crate/module name (e.g., "brightkit-brightness").
    pub pkg_name: String,
    /// Swift source files to compile.
    pub swift_sources: Vec<PathBuf>,
    /// Output library name (e.g., "BrightnessHelper").
    pub lib_name: String,
    /// Frameworks to link.
    pub frameworks: Vec<String>,
    /// Minimum iOS version passed to `swiftc -target`.
    pub ios_deployment_target: String,
}

impl AppleSwiftConfig {
    /// Create a new config with required fields.
    #[must_use]
    pub fn new(pkg_name: impl Into<String>, lib_name: impl Into<String>) -> Self {
        Self {
            pkg_name: pkg_name.into(),
            swift_sources: Vec::new(),
            lib_name: lib_name.into(),
            frameworks: vec!["Foundation".to_string()],
            ios_deployment_target: "14.0".to_string(),
        }
    }

    /// Add a Swift source file.
    #[must_use]
    pub fn swift_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.swift_sources.push(path.into());
        self
    }

    /// Add a framework to link.
    #[must_use]
    pub fn framework(mut self, name: impl Into<String>) -> Self {
        self.frameworks.push(name.into());
        self
    }
}

/// Run `xcrun` and return its trimmed stdout.
#[cfg(any(target_os = "ios", target_os = "macos"))]
fn xcrun(args: &[&str]) -> String {
    let output = std::process::Command::new("xcrun")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("xcrun {args:?} failed: {e}"));
    assert!(output.status.success(), "xcrun {args:?} exited with {}", output.status);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Compile Swift code and link it into the crate.
///
/// This handles:
/// 1. Swift bridge generation
/// 2. Creating bridging headers
/// 3. Compiling Swift to object file
/// 4. Creating static library
/// 5. Linking frameworks
///
/// # Arguments
/// * `bridge_rs` - Path to the Rust bridge module
/// * `config` - Swift compilation configuration
///
/// # Panics
/// Panics with the compiler output when any toolchain step fails.
#[cfg(any(target_os = "ios", target_os = "macos"))]
pub fn compile_swift(bridge_rs: &str, config: &AppleSwiftConfig) {
    use std::env;
    use std::fs;
    use std::process::Command;

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let target = env::var("TARGET").expect("TARGET not set");

    println!("cargo:rerun-if-changed={bridge_rs}");
    for source in &config.swift_sources {
        println!("cargo:rerun-if-changed={}", manifest_dir.join(source).display());
    }

    swift_bridge_build::parse_bridges(vec![bridge_rs])
        .write_all_concatenated(out_dir.clone(), &config.pkg_name);

    let core_h = out_dir.join("SwiftBridgeCore.h");
    let pkg_h = out_dir.join(format!("{0}/{0}.h", config.pkg_name));
    let bridging_h = out_dir.join("Bridging-Header.h");
    fs::write(
        &bridging_h,
        format!(
            "#include \"{}\"\n#include \"{}\"\n",
            core_h.display(),
            pkg_h.display()
        ),
    )
    .expect("failed to write bridging header");

    // swiftc wants a single module here, so generated and handwritten
    // sources are concatenated.
    let mut generated = vec![
        out_dir.join("SwiftBridgeCore.swift"),
        out_dir.join(format!("{0}/{0}.swift", config.pkg_name)),
    ];
    generated.extend(config.swift_sources.iter().map(|s| manifest_dir.join(s)));

    let mut combined = String::new();
    for path in &generated {
        let text = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
        combined.push_str(&text);
        combined.push('\n');
    }
    let combined_swift = out_dir.join(format!("Combined{}.swift", config.lib_name));
    fs::write(&combined_swift, combined).expect("failed to write combined Swift file");

    let sdk = if target.contains("ios") { "iphoneos" } else { "macosx" };
    let sdk_path = xcrun(&["--sdk", sdk, "--show-sdk-path"]);

    let swift_target = if target.contains("ios") {
        format!("arm64-apple-ios{}", config.ios_deployment_target)
    } else if target.contains("aarch64") {
        "arm64-apple-macos12.3".to_string()
    } else {
        "x86_64-apple-macos12.3".to_string()
    };

    let obj_file = out_dir.join(format!("{}.o", config.lib_name));
    let mut swiftc = Command::new("swiftc");
    swiftc
        .arg("-emit-object")
        .arg("-o")
        .arg(&obj_file)
        .arg("-sdk")
        .arg(&sdk_path)
        .arg("-target")
        .arg(&swift_target)
        .arg("-import-objc-header")
        .arg(&bridging_h)
        .arg("-parse-as-library")
        .arg("-module-name")
        .arg(&config.lib_name)
        .arg(&combined_swift);

    let output = swiftc.output().expect("failed to run swiftc");
    if !output.status.success() {
        eprintln!("swiftc args: {:?}", swiftc.get_args().collect::<Vec<_>>());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        panic!("Swift compilation failed");
    }

    let lib_file = out_dir.join(format!("lib{}.a", config.lib_name));
    let ar_status = Command::new("ar")
        .arg("rcs")
        .arg(&lib_file)
        .arg(&obj_file)
        .status()
        .expect("failed to run ar");
    assert!(ar_status.success(), "ar failed");

    println!("cargo:rustc-link-search=native={}", out_dir.display());
    println!("cargo:rustc-link-lib=static={}", config.lib_name);

    let swiftc_path = PathBuf::from(xcrun(&["--find", "swiftc"]));
    if let Some(toolchain) = swiftc_path.parent().and_then(|bin| bin.parent()) {
        let runtime = if target.contains("ios") { "iphoneos" } else { "macosx" };
        let swift_lib = toolchain.join("lib/swift").join(runtime);
        println!("cargo:rustc-link-search=native={}", swift_lib.display());
    }

    for framework in &config.frameworks {
        println!("cargo:rustc-link-lib=framework={framework}");
    }
}

/// No-op on non-Apple platforms.
#[cfg(not(any(target_os = "ios", target_os = "macos")))]
pub const fn compile_swift(_bridge_rs: &str, _config: &AppleSwiftConfig) {}
