use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

/// Output devices of the default host.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_out = host.default_output_device().and_then(|d| d.name().ok());

    let mut out = Vec::new();
    for dev in host.output_devices()? {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        let cfg = dev.default_output_config().ok();
        out.push(DeviceInfo {
            is_default: default_out.as_deref() == Some(name.as_str()),
            channels: cfg.as_ref().map(|c| c.channels()),
            sample_rate: cfg.as_ref().map(|c| c.sample_rate().0),
            name,
        });
    }
    Ok(out)
}

/// Pretty-print for CLI
pub fn print_devices() -> Result<()> {
    let list = list_devices()?;
    if list.is_empty() {
        println!("(no output devices found)");
        return Ok(());
    }
    for (i, d) in list.iter().enumerate() {
        let mark = if d.is_default { "*" } else { " " };
        let cfg = match (d.channels, d.sample_rate) {
            (Some(ch), Some(sr)) => format!("  ({ch} ch @ {sr} Hz)"),
            _ => String::new(),
        };
        println!("{mark}{i:>2}  {}{cfg}", d.name);
    }
    Ok(())
}

/// Output device whose name contains `name_substr` (case-insensitive),
/// falling back to the host default.
pub(crate) fn pick_output(host: &cpal::Host, name_substr: Option<&str>) -> Result<Option<cpal::Device>> {
    if let Some(q) = name_substr {
        let q = q.to_lowercase();
        for dev in host.output_devices()? {
            if dev.name().unwrap_or_default().to_lowercase().contains(&q) {
                return Ok(Some(dev));
            }
        }
        log::warn!("no output device matches `{q}`, using the default");
    }
    Ok(host.default_output_device())
}
