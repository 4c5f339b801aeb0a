// SPDX-License-Identifier: GPL-3.0-only

#[macro_use]
extern crate tracing;

#[cfg(not(feature = "linux-platform"))]
fn main() {
    eprintln!("brightctl requires the linux-platform feature");
    std::process::exit(1);
}

#[cfg(feature = "linux-platform")]
mod cli {
    use std::time::Duration;

    use clap::{Parser, Subcommand};

    use brightctl::config::StoredState;
    use brightctl::coordinator::{Coordinator, CoordinatorOptions};
    use brightctl::events::Snapshot;
    use brightctl::hotplug;
    use brightctl::platform::LinuxPlatform;
    use brightctl::vcp::{Timing, VcpController};

    #[derive(Parser)]
    #[command(name = "brightctl", about = "DDC/CI brightness control for external monitors")]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// List detected displays
        List,
        /// Print the active display's brightness percentage
        Get {
            /// Display index from `list`
            #[arg(long)]
            display: Option<usize>,
        },
        /// Set brightness to a percentage in 0..=100
        Set {
            percent: u8,
            /// Display index from `list`
            #[arg(long)]
            display: Option<usize>,
        },
        /// Step brightness up
        Up,
        /// Step brightness down
        Down,
        /// Keep running, rescanning on display hotplug and printing changes
        Watch,
    }

    fn setup_logs() {
        use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

        let fmt_layer = fmt::layer().with_target(false);
        let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
            "warn,{}=info",
            env!("CARGO_CRATE_NAME")
        )));

        if let Ok(journal_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .with(journal_layer)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .init();
        }
    }

    /// Poll until the initial discovery pass has published a topology.
    async fn wait_for_discovery(coordinator: &Coordinator) -> Snapshot {
        for _ in 0..100 {
            let snapshot = coordinator.snapshot();
            if !snapshot.devices.is_empty() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        coordinator.snapshot()
    }

    /// Debounced writes and the confirming read need a moment to land
    /// before the process exits.
    async fn flush() {
        let quiet = CoordinatorOptions::default().debounce;
        tokio::time::sleep(quiet + Duration::from_millis(500)).await;
    }

    fn print_snapshot(snapshot: &Snapshot) {
        match &snapshot.active_name {
            Some(name) => println!(
                "{}: {:.0}%",
                name,
                snapshot.percentage * 100.0
            ),
            None => println!("no display"),
        }
    }

    #[tokio::main]
    pub async fn run() {
        setup_logs();
        let cli = Cli::parse();

        let coordinator = Coordinator::spawn(
            Box::new(LinuxPlatform::new()),
            VcpController::new(Timing::default()),
            StoredState::load(),
            CoordinatorOptions::default(),
        );

        let snapshot = wait_for_discovery(&coordinator).await;
        match cli.command {
            Command::List => {
                if snapshot.devices.is_empty() {
                    println!("no displays detected");
                    return;
                }
                for (index, device) in snapshot.devices.iter().enumerate() {
                    let marker = if snapshot.active_index == Some(index) {
                        "*"
                    } else {
                        " "
                    };
                    let geometry = match (device.resolution, device.refresh_hz) {
                        (Some((w, h)), Some(hz)) => format!(" ({w}x{h} @ {hz:.0} Hz)"),
                        (Some((w, h)), None) => format!(" ({w}x{h})"),
                        _ => String::new(),
                    };
                    println!("{marker} {index}: {} [{}]{geometry}", device.name, device.id);
                }
            }
            Command::Get { display } => {
                if let Some(index) = display {
                    coordinator.select_device(index);
                }
                // Let the background read of the selected device settle.
                tokio::time::sleep(Duration::from_millis(500)).await;
                print_snapshot(&coordinator.snapshot());
            }
            Command::Set { percent, display } => {
                if let Some(index) = display {
                    coordinator.select_device(index);
                }
                let value = f32::from(percent.min(100)) / 100.0;
                coordinator.set_exact(value, false);
                flush().await;
                print_snapshot(&coordinator.snapshot());
            }
            Command::Up => {
                coordinator.increase();
                flush().await;
                print_snapshot(&coordinator.snapshot());
            }
            Command::Down => {
                coordinator.decrease();
                flush().await;
                print_snapshot(&coordinator.snapshot());
            }
            Command::Watch => {
                print_snapshot(&snapshot);
                match hotplug::watch_topology() {
                    Ok(topology) => {
                        coordinator.resync_on(topology, hotplug::SETTLE_DELAY)
                    }
                    Err(err) => warn!("hotplug monitoring unavailable: {err}"),
                }
                let mut changes = coordinator.watch();
                while changes.changed().await.is_ok() {
                    print_snapshot(&changes.borrow().clone());
                }
            }
        }
    }
}

#[cfg(feature = "linux-platform")]
fn main() {
    cli::run();
}
