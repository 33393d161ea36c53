//! Android brightness backend using JNI.
//!
//! Reads `Settings.System.SCREEN_BRIGHTNESS` through the `ContentResolver`
//! and observes it with a `ContentObserver` subclass shipped as embedded DEX
//! bytecode. Each observer carries a handle; its `onChange` calls back into
//! [`native_on_change`], which routes the notification to the matching
//! [`ChangeHandler`].

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, OnceLock};

use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::sys::jlong;
use jni::{JNIEnv, JavaVM, NativeMethod};
use log::{debug, error, info, warn};

use crate::{Backend, BrightnessValue, ChangeHandler, Error, Registration, Result};

/// Embedded DEX bytecode containing the `BrightnessObserver` class.
static DEX_BYTES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/classes.dex"));

const HELPER_CLASS: &str = "brightkit.brightness.BrightnessObserver";
const SCREEN_BRIGHTNESS: &str = "screen_brightness";

/// Cached class loader for the embedded DEX.
static CLASS_LOADER: OnceLock<GlobalRef> = OnceLock::new();
/// Global reference to the Android Context.
static GLOBAL_CONTEXT: OnceLock<GlobalRef> = OnceLock::new();
/// Global reference to the Java VM.
static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();

static NEXT_HANDLE: AtomicI64 = AtomicI64::new(1);
static HANDLERS: OnceLock<Mutex<HashMap<i64, ChangeHandler>>> = OnceLock::new();

fn handlers() -> &'static Mutex<HashMap<i64, ChangeHandler>> {
    HANDLERS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn platform_error(what: &str) -> impl FnOnce(jni::errors::Error) -> Error + '_ {
    move |e| Error::Platform(format!("{what}: {e}"))
}

/// Clear a pending Java exception so later JNI calls on this thread work.
fn clear_exception(env: &mut JNIEnv) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// Initialize the brightness subsystem with a Context.
pub fn init(env: &mut JNIEnv, context: &JObject) -> Result<()> {
    if GLOBAL_CONTEXT.get().is_some() {
        return Ok(());
    }

    if JAVA_VM.get().is_none() {
        let vm = env.get_java_vm().map_err(platform_error("get_java_vm failed"))?;
        let _ = JAVA_VM.set(vm);
    }

    init_class_loader(env, context)?;
    register_natives(env)?;

    let context_ref = env
        .new_global_ref(context)
        .map_err(platform_error("new_global_ref context failed"))?;
    let _ = GLOBAL_CONTEXT.set(context_ref);

    info!("brightness subsystem initialized");
    Ok(())
}

fn init_class_loader(env: &mut JNIEnv, context: &JObject) -> Result<()> {
    if CLASS_LOADER.get().is_some() {
        return Ok(());
    }

    let cache_dir = env
        .call_method(context, "getCacheDir", "()Ljava/io/File;", &[])
        .and_then(|v| v.l())
        .map_err(platform_error("getCacheDir failed"))?;
    let cache_path = env
        .call_method(&cache_dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .map_err(platform_error("getAbsolutePath failed"))?;
    let cache_path_str: String = env
        .get_string((&cache_path).into())
        .map_err(platform_error("get_string failed"))?
        .into();

    let dex_path = format!("{cache_path_str}/brightkit_brightness.dex");
    // A previous run leaves the file read-only.
    let _ = std::fs::remove_file(&dex_path);
    std::fs::write(&dex_path, DEX_BYTES)?;

    // Android 14 refuses to load writable DEX files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dex_path, std::fs::Permissions::from_mode(0o444))?;
    }

    let dex_path_jstring = env
        .new_string(&dex_path)
        .map_err(platform_error("new_string failed"))?;
    let parent_loader = env
        .call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .and_then(|v| v.l())
        .map_err(platform_error("getClassLoader failed"))?;

    let class_loader = env
        .new_object(
            "dalvik/system/DexClassLoader",
            "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/ClassLoader;)V",
            &[
                JValue::Object(&dex_path_jstring),
                JValue::Object(&cache_path),
                JValue::Object(&JObject::null()),
                JValue::Object(&parent_loader),
            ],
        )
        .map_err(|e| {
            error!("new DexClassLoader failed: {e}");
            Error::Platform(format!("new DexClassLoader: {e}"))
        })?;

    let global_ref = env
        .new_global_ref(class_loader)
        .map_err(platform_error("new_global_ref class loader failed"))?;
    let _ = CLASS_LOADER.set(global_ref);

    debug!("DexClassLoader ready at {dex_path}");
    Ok(())
}

fn load_helper_class<'a>(env: &mut JNIEnv<'a>) -> Result<JClass<'a>> {
    let class_loader = CLASS_LOADER
        .get()
        .ok_or_else(|| Error::Platform("Class loader not initialized. Call init() first.".into()))?;

    let name = env
        .new_string(HELPER_CLASS)
        .map_err(platform_error("new_string failed"))?;

    let class = env
        .call_method(
            class_loader.as_obj(),
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )
        .and_then(|v| v.l())
        .map_err(platform_error("loadClass failed"))?;

    Ok(class.into())
}

// Classes loaded from a secondary DEX are invisible to the default symbol
// lookup, so the native method must be bound explicitly.
fn register_natives(env: &mut JNIEnv) -> Result<()> {
    let class = load_helper_class(env)?;
    let methods = [NativeMethod {
        name: "nativeOnChange".into(),
        sig: "(J)V".into(),
        fn_ptr: native_on_change as *mut c_void,
    }];

    env.register_native_methods(&class, &methods)
        .map_err(platform_error("register_native_methods failed"))
}

fn get_env_and_context() -> Result<(jni::AttachGuard<'static>, JObject<'static>)> {
    let vm = JAVA_VM
        .get()
        .ok_or_else(|| Error::Platform("JavaVM not initialized. Call init() first.".into()))?;
    let context_ref = GLOBAL_CONTEXT
        .get()
        .ok_or_else(|| Error::Platform("Context not initialized. Call init() first.".into()))?;

    let env = vm
        .attach_current_thread()
        .map_err(platform_error("attach_current_thread failed"))?;

    let local_ref = env
        .new_local_ref(context_ref.as_obj())
        .map_err(platform_error("new_local_ref failed"))?;
    Ok((env, local_ref))
}

fn read_setting() -> Result<i32> {
    let (mut env, context) = get_env_and_context()?;

    let result = (|| {
        let resolver = env
            .call_method(
                &context,
                "getContentResolver",
                "()Landroid/content/ContentResolver;",
                &[],
            )?
            .l()?;
        let name = env.new_string(SCREEN_BRIGHTNESS)?;
        env.call_static_method(
            "android/provider/Settings$System",
            "getInt",
            "(Landroid/content/ContentResolver;Ljava/lang/String;I)I",
            &[
                JValue::Object(&resolver),
                JValue::Object(&name),
                JValue::Int(-1),
            ],
        )?
        .i()
    })();

    result.map_err(|e| {
        clear_exception(&mut env);
        Error::Platform(format!("Settings.System.getInt failed: {e}"))
    })
}

/// Brightness backend over `Settings.System`.
#[derive(Debug)]
pub struct SettingsBackend {
    _initialized: (),
}

impl SettingsBackend {
    /// Create the backend. [`init`] must have been called.
    pub fn new() -> Result<Self> {
        if JAVA_VM.get().is_none() || GLOBAL_CONTEXT.get().is_none() {
            return Err(Error::Platform(
                "Android context not initialized. Call init() first.".into(),
            ));
        }
        Ok(Self { _initialized: () })
    }
}

impl Backend for SettingsBackend {
    fn read(&self) -> BrightnessValue {
        match read_setting() {
            Ok(raw) => BrightnessValue::from_raw(i64::from(raw)),
            Err(err) => {
                warn!("reading screen brightness failed: {err}");
                BrightnessValue::UNREADABLE
            }
        }
    }

    fn register(&self, handler: ChangeHandler) -> Result<Box<dyn Registration>> {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        handlers()
            .lock()
            .expect("handler map mutex poisoned")
            .insert(handle, handler);

        let registered = (|| {
            let (mut env, context) = get_env_and_context()?;
            let class = load_helper_class(&mut env)?;
            let observer = env
                .new_object(&class, "(J)V", &[JValue::Long(handle)])
                .and_then(|observer| {
                    env.call_method(
                        &observer,
                        "register",
                        "(Landroid/content/Context;)V",
                        &[JValue::Object(&context)],
                    )?;
                    Ok(observer)
                })
                .map_err(|e| {
                    clear_exception(&mut env);
                    Error::Platform(format!("registerContentObserver failed: {e}"))
                })?;
            env.new_global_ref(observer)
                .map_err(platform_error("new_global_ref observer failed"))
        })();

        match registered {
            Ok(observer) => Ok(Box::new(ObserverRegistration { handle, observer })),
            Err(err) => {
                handlers()
                    .lock()
                    .expect("handler map mutex poisoned")
                    .remove(&handle);
                Err(err)
            }
        }
    }
}

struct ObserverRegistration {
    handle: i64,
    observer: GlobalRef,
}

impl fmt::Debug for ObserverRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistration")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Registration for ObserverRegistration {
    fn unregister(self: Box<Self>) {
        handlers()
            .lock()
            .expect("handler map mutex poisoned")
            .remove(&self.handle);

        let result = (|| {
            let (mut env, context) = get_env_and_context()?;
            env.call_method(
                self.observer.as_obj(),
                "unregister",
                "(Landroid/content/Context;)V",
                &[JValue::Object(&context)],
            )
            .map_err(|e| {
                clear_exception(&mut env);
                Error::Platform(format!("unregisterContentObserver failed: {e}"))
            })?;
            Ok::<(), Error>(())
        })();

        if let Err(err) = result {
            error!("failed to unregister brightness observer {}: {err}", self.handle);
        }
    }
}

/// Bound to `BrightnessObserver.nativeOnChange(long)`; runs on the main looper.
extern "system" fn native_on_change(_env: JNIEnv, _observer: JObject, handle: jlong) {
    let handler = handlers()
        .lock()
        .expect("handler map mutex poisoned")
        .get(&handle)
        .cloned();

    match handler {
        Some(handler) => handler.notify(),
        None => debug!("brightness change for retired observer {handle}"),
    }
}
