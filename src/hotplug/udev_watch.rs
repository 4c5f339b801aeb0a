// SPDX-License-Identifier: GPL-3.0-only

use std::os::fd::AsRawFd;
use std::time::Duration;

use tokio::sync::mpsc;

/// Delay between a hotplug edge and the rescan it triggers. EDID and the
/// DDC/CI service need a moment to come up after a connector change.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Start watching for DRM connector changes.
///
/// Returns a receiver that yields one unit per plug/unplug edge. Edges are
/// coalesced when the receiver lags. Dropping the receiver ends the poll
/// loop on the next event.
pub fn watch_topology() -> std::io::Result<mpsc::Receiver<()>> {
    // The drm_minor devtype filter drops unrelated DRM events up front.
    let socket = udev::MonitorBuilder::new()?
        .match_subsystem_devtype("drm", "drm_minor")?
        .listen()?;
    let (tx, rx) = mpsc::channel(4);

    std::thread::Builder::new()
        .name("hotplug-watch".into())
        .spawn(move || run(socket, tx))?;

    Ok(rx)
}

fn run(socket: udev::MonitorSocket, tx: mpsc::Sender<()>) {
    info!("display hotplug monitoring started");
    let fd = socket.as_raw_fd();

    loop {
        let mut poll_fd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };

        // Negative timeout blocks until the socket is readable.
        let result = unsafe { libc::poll(&mut poll_fd, 1, -1) };
        if result < 0 {
            error!(error = %std::io::Error::last_os_error(), "udev poll failed");
            return;
        }
        if result == 0 {
            continue;
        }

        for event in socket.iter() {
            match event.event_type() {
                udev::EventType::Add | udev::EventType::Remove | udev::EventType::Change => {
                    debug!(
                        event_type = ?event.event_type(),
                        syspath = ?event.syspath(),
                        "connector event"
                    );
                    match tx.try_send(()) {
                        // A full channel already carries a pending edge.
                        Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                        Err(mpsc::error::TrySendError::Closed(())) => {
                            debug!("hotplug receiver dropped, stopping monitor");
                            return;
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
