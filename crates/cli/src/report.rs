//! Boxed plain-text summaries for terminal output.

use estate_core::finance::Emi;
use estate_core::{Agent, DashboardStats, Property, Session};

const INNER: usize = 62;
const LABEL: usize = 20;
const VALUE: usize = INNER - LABEL - 4;

/// Line-by-line builder for one box.
struct Boxed {
    out: String,
}

impl Boxed {
    fn new(title: &str) -> Self {
        let mut b = Self {
            out: String::from("\n"),
        };
        b.out.push_str(&format!("╔{}╗\n", "═".repeat(INNER)));
        b.out.push_str(&format!("║{:^INNER$}║\n", fit(title, INNER)));
        b.divider();
        b
    }

    fn divider(&mut self) {
        self.out.push_str(&format!("╠{}╣\n", "═".repeat(INNER)));
    }

    fn row(&mut self, label: &str, value: impl std::fmt::Display) {
        let label = format!("{label}:");
        self.out.push_str(&format!(
            "║  {:<LABEL$}{:>VALUE$}  ║\n",
            fit(&label, LABEL),
            fit(&value.to_string(), VALUE)
        ));
    }

    fn line(&mut self, text: &str) {
        let width = INNER - 4;
        self.out
            .push_str(&format!("║  {:<width$}  ║\n", fit(text, width)));
    }

    fn blank(&mut self) {
        self.out.push_str(&format!("║{}║\n", " ".repeat(INNER)));
    }

    fn finish(mut self) -> String {
        self.out.push_str(&format!("╚{}╝\n", "═".repeat(INNER)));
        self.out
    }
}

/// Truncates to `width` characters, marking the cut with `…`.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_owned();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Whole units with thousands separators.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

pub fn render_listings(title: &str, listings: &[Property]) -> String {
    let mut b = Boxed::new(title);
    b.row("Listings", listings.len());

    let prices = listings.iter().map(|p| p.price);
    if let (Some(lo), Some(hi)) = (
        prices.clone().reduce(f64::min),
        prices.reduce(f64::max),
    ) {
        b.row("Price range", format!("{} – {}", format_amount(lo), format_amount(hi)));
    }
    let featured = listings.iter().filter(|p| p.featured).count();
    b.row("Featured", featured);

    if listings.is_empty() {
        b.divider();
        b.line("No listings match.");
        return b.finish();
    }

    b.divider();
    for (i, p) in listings.iter().enumerate() {
        if i > 0 {
            b.blank();
        }
        let name = if p.title.is_empty() { p.id.as_str() } else { p.title.as_str() };
        b.line(&format!("{}. {}{}", i + 1, name, if p.featured { " ★" } else { "" }));
        b.line(&format!(
            "   {} | {} | {} | {}",
            p.status,
            if p.kind.is_empty() { "-" } else { p.kind.as_str() },
            format_amount(p.price),
            if p.address.city.is_empty() { "-" } else { p.address.city.as_str() },
        ));
        b.line(&format!("   id {}", p.id));
    }
    b.finish()
}

pub fn render_property(p: &Property) -> String {
    let mut b = Boxed::new(if p.title.is_empty() { "PROPERTY" } else { p.title.as_str() });
    b.row("Id", &p.id);
    b.row("Type", if p.kind.is_empty() { "-" } else { p.kind.as_str() });
    b.row("Status", p.status);
    b.row("Price", format_amount(p.price));
    b.row("Bedrooms", p.bedrooms);
    b.row("Bathrooms", p.bathrooms);
    b.row("Area", format_amount(p.area));
    b.row("Featured", if p.featured { "yes" } else { "no" });

    let agent = match &p.agent {
        Some(r) => r.agent().map_or_else(|| r.id().to_owned(), |a| a.name.clone()),
        None => "-".to_owned(),
    };
    b.row("Agent", agent);
    b.row("Images", p.images.len());
    if let Some(img) = p.primary_image() {
        b.row("Cover", &img.url);
    }

    b.divider();
    let address = p.address.one_line();
    b.line(if address.is_empty() { "No address on file." } else { address.as_str() });
    if !p.amenities.is_empty() {
        b.line(&format!(
            "Amenities: {}",
            p.amenities.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        ));
    }
    if !p.description.is_empty() {
        b.blank();
        b.line(&p.description);
    }
    b.finish()
}

pub fn render_session(s: &Session) -> String {
    let mut b = Boxed::new("SIGNED IN");
    b.row("User", &s.id);
    b.row("Name", if s.name.is_empty() { "-" } else { s.name.as_str() });
    b.row("Email", &s.email);
    b.row("Role", s.role);
    b.finish()
}

pub fn render_agents(agents: &[Agent]) -> String {
    let mut b = Boxed::new("AGENTS");
    b.row("Agents", agents.len());
    b.row("Active", agents.iter().filter(|a| a.active).count());
    b.divider();
    if agents.is_empty() {
        b.line("No agents on file.");
    }
    for a in agents {
        let licence = if a.license_number.is_empty() { "-" } else { a.license_number.as_str() };
        b.line(&format!(
            "{}{} <{}> licence {}",
            a.name,
            if a.active { "" } else { " (inactive)" },
            a.email,
            licence
        ));
    }
    b.finish()
}

pub fn render_stats(stats: &DashboardStats) -> String {
    let mut b = Boxed::new("DASHBOARD");
    b.row("Properties", stats.total_properties);
    b.row("Users", stats.total_users);
    b.row("Agents", stats.total_agents);
    b.row("Inquiries", stats.total_inquiries);
    if !stats.properties_by_status.is_empty() {
        b.divider();
        for (status, count) in &stats.properties_by_status {
            b.row(status, count);
        }
    }
    b.finish()
}

pub fn render_emi(principal: f64, rate: f64, months: u32, emi: &Emi) -> String {
    let mut b = Boxed::new("LOAN ESTIMATE");
    b.row("Principal", format_amount(principal));
    b.row("Annual rate", format!("{rate:.2}%"));
    b.row("Tenure", format!("{months} months"));
    b.divider();
    b.row("Monthly EMI", format_amount(emi.monthly));
    b.row("Total interest", format_amount(emi.total_interest));
    b.row("Total payable", format_amount(emi.total_payable));
    b.finish()
}
