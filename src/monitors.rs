use anyhow::{Context, Result};
use std::collections::HashMap;
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;

/// Pixel resolution of one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Monitor name (e.g. "eDP-1") mapped to its current resolution.
pub type MonitorMap = HashMap<String, Resolution>;

/// Query RandR for every output attached to an active CRTC.
///
/// Opens a fresh X connection on each call: the monitor set can change at
/// runtime, and this runs once per loop iteration and once more before the
/// backup wallpaper is applied at exit.
pub fn list_monitors() -> Result<MonitorMap> {
    let (conn, screen_num) = x11rb::connect(None).context("connect to X server")?;
    let root = conn.setup().roots[screen_num].root;

    let resources = conn
        .randr_get_screen_resources_current(root)
        .context("request screen resources")?
        .reply()
        .context("read screen resources")?;

    let mut monitors = MonitorMap::new();

    for &crtc in &resources.crtcs {
        let info = conn
            .randr_get_crtc_info(crtc, resources.config_timestamp)
            .context("request CRTC info")?
            .reply()
            .context("read CRTC info")?;

        // A CRTC without a mode drives nothing.
        if info.width == 0 || info.height == 0 {
            continue;
        }

        for &output in &info.outputs {
            let output_info = conn
                .randr_get_output_info(output, resources.config_timestamp)
                .context("request output info")?
                .reply()
                .context("read output info")?;

            let name = String::from_utf8_lossy(&output_info.name).into_owned();
            monitors.insert(
                name,
                Resolution {
                    width: u32::from(info.width),
                    height: u32::from(info.height),
                },
            );
        }
    }

    Ok(monitors)
}
