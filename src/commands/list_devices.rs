//! List available audio input devices.

use crate::recording::alsa::with_muted_stderr;
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

/// Prints every audio input device with its index, name, and configuration.
///
/// The index or name can be set as `[audio].device` in babble.toml.
///
/// # Errors
/// - If the audio host cannot enumerate input devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (default_name, devices) =
        with_muted_stderr(|| -> anyhow::Result<(Option<String>, Vec<cpal::Device>)> {
            let host = cpal::default_host();
            let default_name = host.default_input_device().and_then(|d| d.name().ok());
            let devices: Vec<cpal::Device> = host
                .input_devices()
                .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?
                .filter(|device| device.name().is_ok())
                .collect();
            Ok((default_name, devices))
        })?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!();
    println!("Audio input devices:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let marker = if default_name.as_deref() == Some(name.as_str()) {
            "  [default]"
        } else {
            ""
        };
        match device.default_input_config() {
            Ok(config) => println!(
                "  {index}: {name}{marker}  ({}Hz, {} ch)",
                config.sample_rate().0,
                config.channels()
            ),
            Err(_) => println!("  {index}: {name}{marker}  (configuration unavailable)"),
        }
    }
    println!();
    println!("Set the index or name as [audio].device in ~/.config/babble/babble.toml");

    Ok(())
}
