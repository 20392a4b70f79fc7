//! Tool Handler
//!
//! Handles tool calls by composing the credential resolver, the shared
//! session and the spaces cache. Every failure becomes an error result for
//! that one call; nothing here aborts the server.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use seatsurf_core::datetime::{display_datetime, normalize_datetime};
use seatsurf_core::{
    AvailabilityPartition, CacheStore, CachedEntity, CredentialOverrides, CredentialResolver, Error,
    NewBooking, Paths, Result, SessionManager,
};

use crate::protocol::ToolResult;

/// Helper to get a string argument
fn get_str(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Helper to get a required string argument
fn require_str(args: &Map<String, Value>, key: &str) -> Result<String> {
    get_str(args, key).ok_or_else(|| Error::Validation(format!("Missing required argument: {}", key)))
}

/// The tool façade shared by every invocation
pub struct ToolHandler {
    session: Arc<SessionManager>,
    credentials: CredentialResolver,
    cache: CacheStore,
}

impl ToolHandler {
    pub fn new(paths: &Paths) -> Self {
        Self::with_parts(
            Arc::new(SessionManager::new()),
            CredentialResolver::new(paths),
            CacheStore::new(paths),
        )
    }

    pub fn with_parts(
        session: Arc<SessionManager>,
        credentials: CredentialResolver,
        cache: CacheStore,
    ) -> Self {
        Self {
            session,
            credentials,
            cache,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Log in from environment/config credentials.
    ///
    /// Returns `Ok(false)` without touching the network when the credentials
    /// are incomplete.
    pub async fn auto_login(&self) -> Result<bool> {
        let credentials = self.credentials.resolve_all(&CredentialOverrides::default());
        if !credentials.is_complete() {
            info!("Credentials incomplete, skipping auto-login");
            return Ok(false);
        }
        self.session.login(&credentials).await?;
        Ok(true)
    }

    /// Handle a tool call
    pub async fn handle(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        match self.dispatch(name, &arguments).await {
            Ok(result) => result,
            Err(e) => {
                if e.requires_login() {
                    info!("Tool {} needs a login (session {})", name, self.session.status().await.as_str());
                } else {
                    warn!("Tool {} failed: {}", name, e);
                }
                ToolResult::error(format!("Error: {}", e))
            }
        }
    }

    async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> Result<ToolResult> {
        let text = match name {
            // =========================================================================
            // Session
            // =========================================================================
            "seatsurfing_login" => self.login(args).await?,
            "seatsurfing_logout" => self.logout().await,

            // =========================================================================
            // Locations and spaces
            // =========================================================================
            "seatsurfing_list_locations" => self.list_locations().await?,
            "seatsurfing_list_spaces" => self.list_spaces(args).await?,
            "seatsurfing_check_availability" => self.check_availability(args).await?,
            "seatsurfing_view_availability" => self.view_availability(args).await?,
            "seatsurfing_refresh_spaces" => self.refresh_spaces().await?,

            // =========================================================================
            // Bookings
            // =========================================================================
            "seatsurfing_create_booking" => self.create_booking(args).await?,
            "seatsurfing_list_my_bookings" => self.list_my_bookings().await?,
            "seatsurfing_cancel_booking" => self.cancel_booking(args).await?,

            // =========================================================================
            // Unknown tool
            // =========================================================================
            _ => {
                warn!("Unknown tool: {}", name);
                return Ok(ToolResult::error(format!("Unknown tool: {}", name)));
            }
        };

        Ok(ToolResult::success(text))
    }

    async fn login(&self, args: &Map<String, Value>) -> Result<String> {
        let overrides = CredentialOverrides {
            url: get_str(args, "url"),
            email: get_str(args, "email"),
            password: get_str(args, "password"),
            organization_id: get_str(args, "organization_id"),
        };
        let credentials = self.credentials.resolve_all(&overrides);
        credentials.validate()?;

        self.session.login(&credentials).await?;
        let user = self.session.get_me().await?;

        let email = if user.email.is_empty() { "unknown" } else { user.email.as_str() };
        Ok(format!("Successfully logged in as {}", email))
    }

    async fn logout(&self) -> String {
        if self.session.is_authenticated().await {
            self.session.logout().await;
            "Logged out.".to_string()
        } else {
            "No active session.".to_string()
        }
    }

    async fn list_locations(&self) -> Result<String> {
        let locations = self.session.locations().await?;
        if locations.is_empty() {
            return Ok("No locations found.".to_string());
        }

        let mut lines = vec![format!("Found {} location(s):\n", locations.len())];
        for location in &locations {
            let description = match location.description.as_deref() {
                Some(d) if !d.is_empty() => format!("\n\t{}", d),
                _ => String::new(),
            };
            lines.push(format!("- {} (ID: {}){}", location.name, location.id, description));
        }
        Ok(lines.join("\n"))
    }

    async fn list_spaces(&self, args: &Map<String, Value>) -> Result<String> {
        let location_id = require_str(args, "location_id")?;
        let spaces = self.session.spaces(&location_id).await?;
        if spaces.is_empty() {
            return Ok("No spaces found in this location.".to_string());
        }

        let mut lines = vec![format!("Found {} space(s):\n", spaces.len())];
        for space in &spaces {
            lines.push(format!("- {} (ID: {})", space.name, space.id));
        }
        Ok(lines.join("\n"))
    }

    async fn check_availability(&self, args: &Map<String, Value>) -> Result<String> {
        let location_id = require_str(args, "location_id")?;
        let start = normalize_datetime(&require_str(args, "start_time")?);
        let end = normalize_datetime(&require_str(args, "end_time")?);

        let spaces = self.session.space_availability(&location_id, &start, &end).await?;
        let split = AvailabilityPartition::partition(spaces);

        let mut lines = vec![format!(
            "Availability for {} to {}:\n",
            display_datetime(&start),
            display_datetime(&end)
        )];

        lines.push(format!("Available ({}):", split.available.len()));
        for space in &split.available {
            lines.push(format!("\t- {} (ID: {})", space.name, space.id));
        }
        lines.push(String::new());

        lines.push(format!("Occupied ({}):", split.occupied.len()));
        for space in &split.occupied {
            lines.push(format!("\t- {} (ID: {})", space.name, space.id));
        }

        Ok(lines.join("\n"))
    }

    async fn view_availability(&self, args: &Map<String, Value>) -> Result<String> {
        let location_id = require_str(args, "location_id")?;

        let cache = self.cache.load();
        if cache.is_empty() {
            return Ok("No spaces cache found. Run seatsurfing_refresh_spaces first.".to_string());
        }

        let spaces = cache.spaces_for(&location_id);
        if spaces.is_empty() {
            return Ok(format!(
                "No spaces found for location {}. Check location_id or refresh cache.",
                location_id
            ));
        }

        let (availability, time_info) = match (get_str(args, "start_time"), get_str(args, "end_time")) {
            (Some(start), Some(end)) => {
                let start = normalize_datetime(&start);
                let end = normalize_datetime(&end);
                let answer = self.session.space_availability(&location_id, &start, &end).await?;
                let availability: HashMap<String, bool> =
                    answer.into_iter().map(|s| (s.id, s.available)).collect();
                let time_info = format!(
                    "Time: {} to {}\n",
                    display_datetime(&start),
                    display_datetime(&end)
                );
                (availability, time_info)
            }
            _ => (
                HashMap::new(),
                "(availability not checked - provide start_time and end_time)\n".to_string(),
            ),
        };

        let location_name = cache.location_name(&location_id).unwrap_or(location_id.as_str());
        Ok(format!(
            "Location: {}\n{}\n{}",
            location_name,
            time_info,
            render_spaces_list(spaces, &availability)
        ))
    }

    async fn refresh_spaces(&self) -> Result<String> {
        let summary = self.cache.refresh(&self.session).await?;

        let mut lines = vec![format!(
            "Refreshed cache with {} location(s) and {} space(s):\n",
            summary.locations, summary.spaces
        )];
        for location in &summary.snapshot.locations {
            let count = summary.snapshot.spaces_for(&location.id).len();
            lines.push(format!("- {}: {} space(s)", location.name, count));
        }
        if summary.failed_locations > 0 {
            lines.push(format!(
                "\nSpaces for {} location(s) could not be fetched and were cached as empty.",
                summary.failed_locations
            ));
        }
        Ok(lines.join("\n"))
    }

    async fn create_booking(&self, args: &Map<String, Value>) -> Result<String> {
        let booking = NewBooking {
            space_id: require_str(args, "space_id")?,
            enter: normalize_datetime(&require_str(args, "start_time")?),
            leave: normalize_datetime(&require_str(args, "end_time")?),
            subject: get_str(args, "subject").unwrap_or_default(),
        };

        let booking_id = self.session.create_booking(&booking).await?;
        Ok(format!(
            "Booking created successfully!\n\nBooking ID: {}\nTime: {} to {}",
            booking_id,
            display_datetime(&booking.enter),
            display_datetime(&booking.leave)
        ))
    }

    async fn list_my_bookings(&self) -> Result<String> {
        let bookings = self.session.my_bookings().await?;
        if bookings.is_empty() {
            return Ok("You have no upcoming bookings.".to_string());
        }

        let mut lines = vec![format!("Your upcoming bookings ({}):\n", bookings.len())];
        for booking in &bookings {
            lines.push(format!(
                "- {}\n\tID: {}\n\tTime: {} -> {}",
                booking.space_label(),
                booking.id,
                display_datetime(&booking.enter),
                display_datetime(&booking.leave)
            ));
        }
        Ok(lines.join("\n\n"))
    }

    async fn cancel_booking(&self, args: &Map<String, Value>) -> Result<String> {
        let booking_id = require_str(args, "booking_id")?;
        self.session.delete_booking(&booking_id).await?;
        Ok(format!("Booking {} has been cancelled.", booking_id))
    }
}

/// Cached spaces grouped by availability, names sorted case-insensitively.
/// Spaces missing from the availability answer are shown as available.
fn render_spaces_list(spaces: &[CachedEntity], availability: &HashMap<String, bool>) -> String {
    let mut sorted: Vec<&CachedEntity> = spaces.iter().collect();
    sorted.sort_by_key(|s| s.name.to_lowercase());

    let (available, occupied): (Vec<&CachedEntity>, Vec<&CachedEntity>) = sorted
        .into_iter()
        .partition(|s| availability.get(&s.id).copied().unwrap_or(true));

    let mut lines = vec![format!("AVAILABLE ({}):", available.len())];
    lines.extend(available.iter().map(|s| format!("\t- {}", s.name)));
    lines.push(String::new());
    lines.push(format!("OCCUPIED ({}):", occupied.len()));
    lines.extend(occupied.iter().map(|s| format!("\t- {}", s.name)));
    lines.join("\n")
}
