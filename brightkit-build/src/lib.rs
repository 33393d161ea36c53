//! Shared build utilities for brightkit crates.
//!
//! This crate provides common functionality for:
//! - Apple: Swift bridge generation and Swift compilation
//! - Android: Kotlin → DEX compilation
//!
//! # Usage
//!
//! In your `build.rs`:
//!
//! ```ignore
//! use brightkit_build::{AppleSwiftConfig, build_kotlin, compile_swift};
//!
//! fn main() {
//!     let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap();
//!
//!     if target_os == "ios" {
//!         let config = AppleSwiftConfig::new("brightkit-brightness", "BrightnessHelper")
//!             .swift_source("src/sys/apple/Brightness.swift")
//!             .framework("UIKit");
//!         compile_swift("src/sys/apple/mod.rs", &config);
//!     }
//!
//!     if target_os == "android" {
//!         build_kotlin(&["src/sys/android/BrightnessObserver.kt"]);
//!     }
//! }
//! ```

#![warn(missing_docs)]

mod android;
mod apple;

pub use android::{AndroidConfig, build_kotlin, find_android_jar, find_d8_jar};
pub use apple::{AppleSwiftConfig, compile_swift};
