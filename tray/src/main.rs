mod icon;
mod tray;

use crossbeam_channel::unbounded;
use juice_core::events::{JuiceEvent, Watcher};
use juice_core::notification::OsascriptNotifier;
use juice_core::registry::{self, SystemRegistry};
use juice_core::{config, Monitor, Preferences};
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tray_icon::{menu::MenuEvent, TrayIcon, TrayIconEvent};
use tracing::{info, warn};

enum UserEvent {
    TrayIconEvent(TrayIconEvent),
    MenuEvent(MenuEvent),
    Juice(JuiceEvent),
}

fn main() {
    // Init tracing to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("juice-tray starting");

    let cfg = config::load();
    let granularity = cfg.drawing_granularity();
    let snapshot_path = cfg.snapshot_path();
    let preferences_path = Preferences::path();

    if let Some(dir) = preferences_path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }

    let mut monitor = Monitor::new(
        SystemRegistry::new(),
        OsascriptNotifier::new(),
        &cfg,
        preferences_path.clone(),
    );
    info!(
        interval = ?cfg.poll_interval(),
        locale = monitor.locale().language(),
        "config loaded"
    );

    let mut event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    // No dock icon; must be set before run()
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    let proxy = event_loop.create_proxy();
    TrayIconEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::TrayIconEvent(event));
    }));

    let proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::MenuEvent(event));
    }));

    // Power-source and preferences changes arrive on a crossbeam channel and
    // are forwarded into the event loop.
    let (juice_tx, juice_rx) = unbounded::<JuiceEvent>();
    Watcher::new(cfg.poll_interval())
        .watch_preferences(preferences_path.clone())
        .spawn(registry::power_source_output, juice_tx);

    let proxy = event_loop.create_proxy();
    std::thread::spawn(move || {
        for event in juice_rx {
            if proxy.send_event(UserEvent::Juice(event)).is_err() {
                break;
            }
        }
    });

    let (menu, menu_items) = tray::build_menu(monitor.preferences());

    // The tray icon must be created inside the event loop (after Init)
    let mut tray_icon: Option<TrayIcon> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        let mut refresh = false;

        match event {
            Event::NewEvents(tao::event::StartCause::Init) => {
                match tray::build_tray(menu.clone()) {
                    Ok(ti) => {
                        tray_icon = Some(ti);
                        info!("status item created");
                    }
                    Err(e) => warn!(error = %e, "failed to create status item"),
                }

                // Wake up the run loop on macOS so the icon appears
                #[cfg(target_os = "macos")]
                {
                    use objc2_core_foundation::CFRunLoop;
                    if let Some(rl) = CFRunLoop::main() {
                        rl.wake_up();
                    }
                }
            }

            Event::UserEvent(UserEvent::Juice(JuiceEvent::PowerSourceChanged)) => {
                refresh = true;
            }

            Event::UserEvent(UserEvent::Juice(JuiceEvent::PreferencesChanged)) => {
                monitor.reload_preferences();
                tray::sync_checks(&menu_items, monitor.preferences());
                refresh = true;
            }

            Event::UserEvent(UserEvent::MenuEvent(event)) => {
                if event.id == menu_items.quit_item.id() {
                    info!("quit requested");
                    tray_icon.take();
                    *control_flow = ControlFlow::Exit;
                    return;
                } else if event.id == menu_items.preferences_item.id() {
                    info!(path = %preferences_path.display(), "opening preferences");
                    if !preferences_path.exists() {
                        if let Err(e) = monitor.preferences().save(&preferences_path) {
                            warn!(error = %e, "failed to write preferences");
                        }
                    }
                    match std::process::Command::new("open").arg(&preferences_path).status() {
                        Ok(status) if status.success() => {}
                        Ok(status) => warn!(%status, "open exited with an error"),
                        Err(e) => warn!(error = %e, "failed to run open"),
                    }
                } else {
                    let result = if let Some(threshold) = menu_items.threshold_for(&event.id) {
                        monitor.update_preferences(|p| p.toggle_threshold(threshold).map(|_| ()))
                    } else if event.id == menu_items.show_time_item.id() {
                        monitor.update_preferences(|p| {
                            let show = !(p.show_time_on_battery && p.show_time_charging);
                            p.show_time_on_battery = show;
                            p.show_time_charging = show;
                            Ok(())
                        })
                    } else if event.id == menu_items.hide_icon_item.id() {
                        monitor.update_preferences(|p| {
                            p.hide_battery_icon = !p.hide_battery_icon;
                            Ok(())
                        })
                    } else {
                        Ok(())
                    };

                    if let Err(e) = result {
                        warn!(error = %e, "failed to update preferences");
                    }
                    tray::sync_checks(&menu_items, monitor.preferences());
                    refresh = true;
                }
            }

            Event::UserEvent(UserEvent::TrayIconEvent(_event)) => {}

            _ => {}
        }

        if refresh {
            let view = monitor.poll();
            if let Some(ref ti) = tray_icon {
                tray::apply_view(ti, &menu_items, &view, granularity);
            }
            if let Some(ref n) = view.notified {
                info!(threshold = n.threshold, "notification posted");
            }
            if let Err(e) = monitor.timeline().write(&snapshot_path) {
                warn!(error = %e, "failed to write widget snapshot");
            }
        }
    });
}
