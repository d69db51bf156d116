//! Fuzz test for settings TOML parsing
//!
//! Tests that settings deserialization handles arbitrary TOML safely.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rawhdd_core::{BehaviorSettings, ImagingSettings, Settings};

fuzz_target!(|data: &str| {
    let result: Result<Settings, _> = toml::from_str(data);

    // If parsing succeeded, the settings must serialize back and convert
    // into an engine config without panicking
    if let Ok(settings) = result {
        let _ = toml::to_string(&settings);
        let _ = toml::to_string_pretty(&settings);
        let _ = settings.imaging.to_config();
        let _ = settings.imaging.log_file.as_os_str().len();
    }

    // Individual sections
    let _: Result<ImagingSettings, _> = toml::from_str(data);
    let _: Result<BehaviorSettings, _> = toml::from_str(data);

    // Sections as they appear in a full config file
    let wrapped = format!("[imaging]\n{}", data);
    let _: Result<Settings, _> = toml::from_str(&wrapped);

    let wrapped = format!("[behavior]\n{}", data);
    let _: Result<Settings, _> = toml::from_str(&wrapped);
});
