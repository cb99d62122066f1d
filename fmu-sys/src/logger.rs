use crate::fmi2 as binding;

/// Rust sink called from the C trampoline once the variadic message has been formatted.
///
/// Reassembles `<instanceName>(<status>): <text>` and forwards it to the [`log`] facade with the
/// instance name as target and the level mapped from the FMI status.
#[no_mangle]
extern "C" fn fmi2_logger_sink(
    _component_environment: binding::fmi2ComponentEnvironment,
    instance_name: binding::fmi2String,
    status: binding::fmi2Status,
    category: binding::fmi2String,
    message: binding::fmi2String,
) {
    let instance_name = if instance_name.is_null() {
        "NULL"
    } else {
        unsafe { std::ffi::CStr::from_ptr(instance_name) }
            .to_str()
            .unwrap_or("NULL")
    };

    let (level, status_name) = match status {
        binding::fmi2Status_fmi2OK => (log::Level::Info, "OK"),
        binding::fmi2Status_fmi2Warning => (log::Level::Warn, "Warning"),
        binding::fmi2Status_fmi2Discard => (log::Level::Trace, "Discard"),
        binding::fmi2Status_fmi2Error => (log::Level::Error, "Error"),
        binding::fmi2Status_fmi2Fatal => (log::Level::Error, "Fatal"),
        binding::fmi2Status_fmi2Pending => (log::Level::Debug, "Pending"),
        _ => (log::Level::Error, "Unknown"),
    };

    let _category = if category.is_null() {
        ""
    } else {
        unsafe { std::ffi::CStr::from_ptr(category) }
            .to_str()
            .unwrap_or("")
    };

    let message = if message.is_null() {
        ""
    } else {
        unsafe { std::ffi::CStr::from_ptr(message) }
            .to_str()
            .unwrap_or("")
    };

    log::logger().log(
        &log::Record::builder()
            .args(format_args!("{instance_name}({status_name}): {message}"))
            .level(level)
            .module_path(Some("fmu"))
            .target(instance_name)
            .build(),
    );
}

#[link(name = "logger", kind = "static")]
extern "C" {
    /// The variadic trampoline implemented in logger.c. Suitable as the `logger` member of
    /// [`binding::fmi2CallbackFunctions`]. Formats into a 1024-byte buffer and calls
    /// [`fmi2_logger_sink`].
    pub fn fmi2_callback_logger(
        componentEnvironment: binding::fmi2ComponentEnvironment,
        instanceName: binding::fmi2String,
        status: binding::fmi2Status,
        category: binding::fmi2String,
        message: binding::fmi2String,
        ...
    );
}
