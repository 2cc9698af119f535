use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use tripweave_shared::ServiceError;
use url::Url;

use crate::{Exporter, Itinerary, Sharer, format_distance, format_duration};

const SLUG_MAX_LEN: usize = 48;

static RE_NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Builds a share slug from the title plus a random tail, e.g. `golden-triangle-4f9k2b7x`.
pub fn generate_share_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = RE_NON_SLUG
        .replace_all(&lowered, "-")
        .trim_start_matches('-')
        .to_owned();

    slug.truncate(SLUG_MAX_LEN);
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "trip" } else { slug };

    let tail = ulid::Ulid::new().to_string().to_lowercase();
    format!("{slug}-{}", &tail[tail.len() - 8..])
}

/// Printable plain-text trip sheet.
#[derive(Clone, Default)]
pub struct DocumentExporter;

impl DocumentExporter {
    pub fn render(itinerary: &Itinerary) -> String {
        let mut out = String::new();
        let title = if itinerary.title.is_empty() {
            "Untitled trip"
        } else {
            &itinerary.title
        };

        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
        let _ = writeln!(out);

        let _ = writeln!(out, "Route");
        for (i, waypoint) in itinerary.waypoints.resolved().enumerate() {
            let address = waypoint
                .address
                .as_deref()
                .map(|a| format!(" ({a})"))
                .unwrap_or_default();
            let _ = writeln!(out, "  {}. {}{address}", i + 1, waypoint.name);
        }

        if let Some(route) = itinerary.current_route() {
            let _ = writeln!(
                out,
                "  Total: {}, {}",
                format_distance(route.total_distance_km),
                format_duration(route.total_duration_min)
            );
        }

        let mut total_cost = 0.0;
        for (i, day) in itinerary.days.iter().enumerate() {
            let _ = writeln!(out);
            match &day.date {
                Some(date) => {
                    let _ = writeln!(out, "Day {} - {date}", i + 1);
                }
                None => {
                    let _ = writeln!(out, "Day {}", i + 1);
                }
            }

            for item in &day.items {
                let time = item
                    .time
                    .as_deref()
                    .map(|t| format!(" [{t}]"))
                    .unwrap_or_default();
                let _ = writeln!(out, "  - {}: {}{time}", item.kind, item.title);
                if let Some(details) = &item.details {
                    let _ = writeln!(out, "      {details}");
                }
            }

            let _ = writeln!(
                out,
                "  {} / {} / est. {:.0}",
                format_distance(day.summary.distance_km),
                format_duration(day.summary.duration_min),
                day.summary.estimated_cost
            );
            total_cost += day.summary.estimated_cost;
        }

        if !itinerary.days.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Estimated total: {total_cost:.0}");
        }

        out
    }
}

#[async_trait::async_trait]
impl Exporter for DocumentExporter {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    async fn export(&self, itinerary: &Itinerary) -> Result<Vec<u8>, ServiceError> {
        Ok(Self::render(itinerary).into_bytes())
    }
}

/// Public link `<base_url>/shared/<slug>`.
#[derive(Clone)]
pub struct LinkSharer {
    base_url: Url,
}

impl LinkSharer {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;

        Ok(Self { base_url })
    }
}

#[async_trait::async_trait]
impl Sharer for LinkSharer {
    async fn share(&self, itinerary: &Itinerary) -> Result<String, ServiceError> {
        let Some(slug) = itinerary.public_slug() else {
            return Err(ServiceError::InvalidRequest(
                "itinerary is not public".to_owned(),
            ));
        };

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidRequest("base url cannot hold a path".to_owned()))?
            .pop_if_empty()
            .extend(["shared", slug]);

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinates, DayItem, DayItemKind, DayPlan, RouteSummary, WaypointList};

    #[test]
    fn test_slug_from_title() {
        let slug = generate_share_slug("  Golden Triangle: Delhi & Agra!! ");
        let (head, tail) = slug.rsplit_once('-').unwrap();

        assert_eq!(head, "golden-triangle-delhi-agra");
        assert_eq!(tail.len(), 8);
        assert!(tail.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(slug, generate_share_slug("Golden Triangle: Delhi & Agra"));
    }

    #[test]
    fn test_slug_for_empty_title() {
        assert!(generate_share_slug("").starts_with("trip-"));
        assert!(generate_share_slug("???").starts_with("trip-"));
    }

    #[tokio::test]
    async fn test_link_sharer_requires_public() {
        let sharer = LinkSharer::new("https://tripweave.example/").unwrap();
        let mut itinerary = Itinerary::new("u1", "Coast run");
        itinerary.share_slug = Some("coast-run-abcd1234".to_owned());

        assert!(sharer.share(&itinerary).await.is_err());

        itinerary.is_public = true;
        assert_eq!(
            sharer.share(&itinerary).await.unwrap(),
            "https://tripweave.example/shared/coast-run-abcd1234"
        );
    }

    #[tokio::test]
    async fn test_document_export() {
        let mut itinerary = Itinerary::new("u1", "Coast run");
        itinerary.waypoints = WaypointList::with_endpoints(
            ("Mumbai", Coordinates::new(19.07, 72.87)),
            ("Goa", Coordinates::new(15.49, 73.82)),
        );
        let mut route = RouteSummary::new(590.0, 660.0);
        route.computed_for = itinerary.waypoints.route_coordinates();
        itinerary.route_summary = Some(route);

        let mut day = DayPlan::new("d1", Some("2025-11-02".to_owned()));
        let mut item = DayItem::new("i1", DayItemKind::PhotoOp, "Sunset at Ratnagiri");
        item.time = Some("18:10".to_owned());
        day.items.push(item);
        day.summary.estimated_cost = 4200.0;
        itinerary.days.push(day);

        let exporter = DocumentExporter;
        let bytes = exporter.export(&itinerary).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Coast run\n=========\n"));
        assert!(text.contains("  1. Mumbai\n"));
        assert!(text.contains("Total: 590 km, 11 h"));
        assert!(text.contains("Day 1 - 2025-11-02"));
        assert!(text.contains("  - photo-op: Sunset at Ratnagiri [18:10]"));
        assert!(text.contains("Estimated total: 4200"));
        assert_eq!(exporter.content_type(), "text/plain; charset=utf-8");
    }
}
