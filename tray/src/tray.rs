use juice_core::{IconUpdate, MenuLines, Preferences, StatusView};
use tracing::warn;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu},
    TrayIcon, TrayIconBuilder,
};

use crate::icon;

/// Percentages offered in the notifications submenu, highest first.
pub fn threshold_choices() -> impl Iterator<Item = u8> {
    (1..=20).rev().map(|i| i * 5)
}

/// Holds references to menu items that can be updated dynamically.
pub struct MenuItems {
    pub power_source_item: MenuItem,
    pub remaining_item: MenuItem,
    pub charge_item: MenuItem,
    pub threshold_items: Vec<(u8, CheckMenuItem)>,
    pub show_time_item: CheckMenuItem,
    pub hide_icon_item: CheckMenuItem,
    pub preferences_item: MenuItem,
    pub quit_item: MenuItem,
}

impl MenuItems {
    /// Threshold bound to a notifications submenu entry.
    pub fn threshold_for(&self, id: &MenuId) -> Option<u8> {
        self.threshold_items
            .iter()
            .find(|(_, item)| item.id() == id)
            .map(|(percentage, _)| *percentage)
    }
}

/// Build the status item menu and return both the menu and item handles.
pub fn build_menu(prefs: &Preferences) -> (Menu, MenuItems) {
    let menu = Menu::new();

    let power_source_item = MenuItem::new("Power Source: Unknown", false, None);
    let remaining_item = MenuItem::new("Calculating", false, None);
    let charge_item = MenuItem::new("--", false, None);

    let notifications = Submenu::new("Notifications", true);
    let threshold_items: Vec<(u8, CheckMenuItem)> = threshold_choices()
        .map(|p| {
            let checked = prefs.notification_thresholds.contains(&p);
            (p, CheckMenuItem::new(format!("{p}%"), true, checked, None))
        })
        .collect();
    for (_, item) in &threshold_items {
        let _ = notifications.append(item);
    }

    let show_time_item = CheckMenuItem::new(
        "Show Time Remaining",
        true,
        prefs.show_time_on_battery && prefs.show_time_charging,
        None,
    );
    let hide_icon_item = CheckMenuItem::new("Hide Battery Icon", true, prefs.hide_battery_icon, None);
    let preferences_item = MenuItem::new("Preferences...", true, None);
    let quit_item = MenuItem::new("Quit", true, None);

    let _ = menu.append_items(&[
        &power_source_item,
        &remaining_item,
        &charge_item,
        &PredefinedMenuItem::separator(),
        &notifications,
        &show_time_item,
        &hide_icon_item,
        &PredefinedMenuItem::separator(),
        &preferences_item,
        &quit_item,
    ]);

    let items = MenuItems {
        power_source_item,
        remaining_item,
        charge_item,
        threshold_items,
        show_time_item,
        hide_icon_item,
        preferences_item,
        quit_item,
    };

    (menu, items)
}

/// Build the status item. The icon is set by the first poll.
pub fn build_tray(menu: Menu) -> Result<TrayIcon, tray_icon::Error> {
    let builder = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip("Juice")
        .with_menu_on_left_click(true);

    #[cfg(target_os = "macos")]
    let builder = builder.with_icon_as_template(true);

    builder.build()
}

/// Update the informational lines at the top of the menu.
pub fn update_lines(items: &MenuItems, lines: &MenuLines) {
    items
        .power_source_item
        .set_text(format!("Power Source: {}", lines.power_source));
    items.remaining_item.set_text(&lines.remaining);
    items.charge_item.set_text(&lines.charge);
}

/// Make the check marks match the preferences.
pub fn sync_checks(items: &MenuItems, prefs: &Preferences) {
    for (p, item) in &items.threshold_items {
        item.set_checked(prefs.notification_thresholds.contains(p));
    }
    items
        .show_time_item
        .set_checked(prefs.show_time_on_battery && prefs.show_time_charging);
    items.hide_icon_item.set_checked(prefs.hide_battery_icon);
}

/// Apply a poll result to the status item and menu.
pub fn apply_view(tray: &TrayIcon, items: &MenuItems, view: &StatusView, granularity: f64) {
    tray.set_title(Some(&view.title));
    let _ = tray.set_tooltip(Some(format!("Juice \u{2014} {}", view.lines.remaining)));
    update_lines(items, &view.lines);

    match view.icon {
        IconUpdate::Keep => {}
        IconUpdate::Hide => {
            let _ = tray.set_icon(None);
        }
        IconUpdate::Draw(ref kind) => match icon::to_icon(icon::render(kind, granularity)) {
            Ok(img) => {
                if let Err(e) = tray.set_icon(Some(img)) {
                    warn!(error = %e, "failed to set tray icon");
                }
                #[cfg(target_os = "macos")]
                tray.set_icon_as_template(true);
            }
            Err(e) => warn!(error = %e, "failed to build tray icon image"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_choices() {
        let choices: Vec<u8> = threshold_choices().collect();
        assert_eq!(choices.len(), 20);
        assert_eq!(choices.first(), Some(&100));
        assert_eq!(choices.last(), Some(&5));
        assert!(choices.windows(2).all(|w| w[0] - w[1] == 5));
    }
}
