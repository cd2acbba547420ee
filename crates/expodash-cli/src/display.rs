//! Plain-text rendering of backend records.

use expodash_core::models::{Alert, Building, Organizer};

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

pub fn print_organizers(organizers: &[Organizer]) {
    if organizers.is_empty() {
        println!("No organizers found.");
        return;
    }
    println!("{:<6} {:<28} {:<32} {:<12}", "ID", "Name", "Email", "Contact");
    for org in organizers {
        println!(
            "{:<6} {:<28} {:<32} {:<12}",
            truncate(&org.id, 6),
            truncate(&org.full_name(), 28),
            truncate(&org.email, 32),
            org.contact_no
        );
    }
}

pub fn print_organizer(org: &Organizer) {
    println!("ID:      {}", org.id);
    println!("Name:    {}", org.full_name());
    println!("Email:   {}", org.email);
    println!("Contact: {}", org.contact_no);
}

pub fn print_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("No alerts sent yet.");
        return;
    }
    for alert in alerts {
        println!(
            "[{}] {} - {}",
            alert.sent_at_display(),
            truncate(&alert.sent_by, 24),
            alert.alert
        );
    }
}

pub fn print_buildings(tag: &str, buildings: &[Building]) {
    if buildings.is_empty() {
        println!("No exhibits found for the selected tag.");
        return;
    }
    for building in buildings {
        println!(
            "{} (building {}, zone {})",
            building.building_name, building.building_id, building.zone_id
        );
        if !building.description.is_empty() {
            println!("  {}", truncate(&building.description, 72));
        }
        for exhibit in building.exhibits_tagged(tag) {
            println!("  - {}", exhibit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("a longer string", 6), "a lon…");
        assert_eq!(truncate("ünïcödé", 4), "ünï…");
    }
}
