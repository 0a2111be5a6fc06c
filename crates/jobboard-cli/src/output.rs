//! Terminal rendering of listings.

use std::fmt::Write;

use serde::Serialize;

use jobboard_models::{list_to_csv, FilterOptions, JobListing, ListingPage};

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// One row per listing plus a paging footer.
pub fn render_page(page: &ListingPage, show_status: bool) -> String {
    let mut out = String::new();
    if page.listings.is_empty() {
        out.push_str("No listings found.\n");
    }

    for listing in &page.listings {
        let status = if show_status {
            format!("{:<10} ", listing.job_status.label())
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{}{:<40} {:<28} {:<20} {:<10} {}",
            status,
            truncate(&listing.slug, 40),
            truncate(&format!("{} @ {}", listing.title, listing.company_name), 28),
            truncate(&listing.location, 20),
            listing.job_type,
            listing.posted_on,
        );
    }

    let _ = writeln!(
        out,
        "Page {} of {} ({} listings)",
        page.page,
        page.total_pages(),
        page.total
    );
    out
}

fn section(out: &mut String, heading: &str, body: &str) {
    if !body.trim().is_empty() {
        let _ = writeln!(out, "\n{}\n{}", heading, body.trim());
    }
}

fn bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}", heading);
    for item in items {
        let _ = writeln!(out, "  - {}", item);
    }
}

/// Full listing detail.
pub fn render_listing(listing: &JobListing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", listing.title);
    let _ = writeln!(
        out,
        "{} | {} | {} | {}",
        listing.company_name, listing.location, listing.job_type, listing.posted_on
    );
    if !listing.is_published() {
        let _ = writeln!(out, "Status: {}", listing.job_status.label());
    }
    if let Some(salary) = listing.salary_range() {
        let _ = writeln!(out, "Salary: {}", salary);
    }
    if !listing.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", list_to_csv(&listing.tags));
    }

    section(&mut out, "Overview", &listing.overview);
    if listing.description != listing.overview {
        section(&mut out, "Description", &listing.description);
    }
    bullets(&mut out, "Responsibilities", &listing.responsibilities);
    bullets(&mut out, "Requirements", &listing.requirements);
    bullets(&mut out, "Benefits", &listing.benefits);
    section(&mut out, "About the company", &listing.about_company);

    let apply: Vec<&str> = [listing.application_url.as_deref(), listing.application_email.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !apply.is_empty() {
        let _ = writeln!(out, "\nApply: {}", apply.join(" or "));
    }
    out
}

pub fn render_filters(options: &FilterOptions) -> String {
    let job_types: Vec<&str> = options.job_types.iter().map(|t| t.as_str()).collect();
    format!(
        "Locations: {}\nJob types: {}\n",
        if options.locations.is_empty() { "-".to_string() } else { options.locations.join(", ") },
        if job_types.is_empty() { "-".to_string() } else { job_types.join(", ") },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobboard_models::JobRecord;

    fn listing() -> JobListing {
        let record: JobRecord = serde_json::from_value(serde_json::json!({
            "id": "1",
            "slug": "rust-engineer-ab12cd",
            "title": "Rust Engineer",
            "company_name": "Northwind",
            "location": "Berlin",
            "job_type": "Contract",
            "job_status": "draft",
            "overview": "Build the board",
            "requirements": ["Rust", "SQL"],
            "application_email": "jobs@northwind.example",
            "salary_min": 90000.0,
            "salary_max": 120000.0,
            "salary_currency": "EUR",
            "created_at": "2024-06-01T00:00:00Z",
            "updated_at": "2024-06-01T00:00:00Z",
            "poster_id": "user-1"
        }))
        .unwrap();
        record.into()
    }

    #[test]
    fn test_render_listing_sections() {
        let text = render_listing(&listing());
        assert!(text.starts_with("Rust Engineer\nNorthwind | Berlin | Contract |"));
        assert!(text.contains("Status: Draft"));
        assert!(text.contains("Salary: EUR 90000 - 120000"));
        assert!(text.contains("Requirements\n  - Rust\n  - SQL"));
        assert!(text.contains("Apply: jobs@northwind.example"));
        assert!(!text.contains("Responsibilities"));
        // Overview doubles as description when none is set
        assert!(!text.contains("Description"));
    }

    #[test]
    fn test_render_page_footer() {
        let page = ListingPage {
            listings: vec![listing()],
            total: 7,
            page: 2,
            page_size: 5,
        };
        let text = render_page(&page, true);
        assert!(text.starts_with("Draft      rust-engineer-ab12cd"));
        assert!(text.ends_with("Page 2 of 2 (7 listings)\n"));

        let empty = render_page(&ListingPage::empty(1, 5), false);
        assert_eq!(empty, "No listings found.\nPage 1 of 1 (0 listings)\n");
    }
}
