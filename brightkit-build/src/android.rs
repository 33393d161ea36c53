//! Android platform build utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Toolchain locations used to turn Kotlin helpers into a DEX file.
#[derive(Debug, Clone)]
pub struct AndroidConfig {
    /// `android.jar` of the platform to compile against.
    pub android_jar: PathBuf,
    /// `d8.jar` from the SDK build tools.
    pub d8_jar: PathBuf,
    /// Kotlin compiler executable.
    pub kotlinc: PathBuf,
    /// Java launcher used to run `d8`.
    pub java: PathBuf,
}

impl AndroidConfig {
    /// Locate the toolchain from `ANDROID_HOME`/`ANDROID_SDK_ROOT`,
    /// `KOTLINC` and `JAVA_HOME`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let java = env::var_os("JAVA_HOME").map_or_else(
            || PathBuf::from("java"),
            |home| PathBuf::from(home).join("bin").join("java"),
        );
        let kotlinc = env::var_os("KOTLINC").map_or_else(|| PathBuf::from("kotlinc"), PathBuf::from);

        Some(Self {
            android_jar: find_android_jar()?,
            d8_jar: find_d8_jar()?,
            kotlinc,
            java,
        })
    }
}

fn sdk_root() -> Option<PathBuf> {
    env::var_os("ANDROID_HOME")
        .or_else(|| env::var_os("ANDROID_SDK_ROOT"))
        .map(PathBuf::from)
}

/// Pick the entry of `dir` whose name sorts last, restricted to entries
/// for which `file` exists.
fn newest_with(dir: &Path, file: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path().join(file))
        .filter(|path| path.exists())
        .collect();
    candidates.sort();
    candidates.pop()
}

/// Find the newest `platforms/android-*/android.jar` in the SDK.
#[must_use]
pub fn find_android_jar() -> Option<PathBuf> {
    newest_with(&sdk_root()?.join("platforms"), "android.jar")
}

/// Find the newest `build-tools/*/lib/d8.jar` in the SDK.
#[must_use]
pub fn find_d8_jar() -> Option<PathBuf> {
    newest_with(&sdk_root()?.join("build-tools"), "lib/d8.jar")
}

/// Compile Kotlin helper sources into `$OUT_DIR/classes.dex`.
///
/// The crate embeds the result with
/// `include_bytes!(concat!(env!("OUT_DIR"), "/classes.dex"))` and loads it
/// at runtime through a `DexClassLoader`.
///
/// # Panics
/// Panics when the Android SDK cannot be located or when `kotlinc` or `d8`
/// fail.
pub fn build_kotlin(sources: &[&str]) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));

    println!("cargo:rerun-if-env-changed=ANDROID_HOME");
    println!("cargo:rerun-if-env-changed=ANDROID_SDK_ROOT");
    for source in sources {
        println!("cargo:rerun-if-changed={source}");
    }

    let config = AndroidConfig::from_env()
        .expect("Android SDK not found: set ANDROID_HOME with a platform and build-tools installed");

    let classes_jar = out_dir.join("kotlin-classes.jar");
    let mut kotlinc = Command::new(&config.kotlinc);
    kotlinc
        .arg("-classpath")
        .arg(&config.android_jar)
        .arg("-no-stdlib")
        .arg("-no-reflect")
        // The DEX ships without the Kotlin runtime, so no intrinsics calls.
        .arg("-Xno-param-assertions")
        .arg("-Xno-call-assertions")
        .arg("-Xno-receiver-assertions")
        .arg("-d")
        .arg(&classes_jar);
    for source in sources {
        kotlinc.arg(manifest_dir.join(source));
    }
    run(&mut kotlinc, "kotlinc");

    let mut d8 = Command::new(&config.java);
    d8.arg("-cp")
        .arg(&config.d8_jar)
        .arg("com.android.tools.r8.D8")
        .arg("--release")
        .arg("--lib")
        .arg(&config.android_jar)
        .arg("--output")
        .arg(&out_dir)
        .arg(&classes_jar);
    run(&mut d8, "d8");

    assert!(
        out_dir.join("classes.dex").exists(),
        "d8 did not produce classes.dex"
    );
}

fn run(command: &mut Command, name: &str) {
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("failed to run {name}: {e}"));
    if !output.status.success() {
        eprintln!("{name} args: {:?}", command.get_args().collect::<Vec<_>>());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        panic!("{name} failed");
    }
}
