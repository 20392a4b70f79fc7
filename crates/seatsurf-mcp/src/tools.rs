//! Seatsurfing Tool Definitions
//!
//! Names and parameter shapes are the contract MCP hosts rely on. All
//! parameters are plain strings.

use serde_json::{json, Value};
use crate::protocol::{Tool, InputSchema};

/// Create a tool definition with the given name, description, and schema properties
fn tool(
    name: &str,
    description: &str,
    properties: Value,
    required: Vec<&str>,
) -> Tool {
    let props = properties.as_object().cloned().unwrap_or_default();
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties: props,
            required: required.into_iter().map(|s| s.to_string()).collect(),
        },
    }
}

/// Get all available Seatsurfing tools
pub fn all_tools() -> Vec<Tool> {
    vec![
        // =========================================================================
        // Session
        // =========================================================================
        tool(
            "seatsurfing_login",
            "Login to Seatsurfing with email and password. Required before using other tools (unless auto-login via environment variables is configured).",
            json!({
                "url": {"type": "string", "description": "Base URL of the Seatsurfing instance (e.g., https://seatsurfing.example.com). Only needed if SEATSURFING_URL env var is not set."},
                "email": {"type": "string", "description": "User email address. Only needed if SEATSURFING_EMAIL env var is not set."},
                "password": {"type": "string", "description": "User password. Only needed if SEATSURFING_PASSWORD env var is not set."},
                "organization_id": {"type": "string", "description": "Organization ID. Only needed if SEATSURFING_ORG_ID env var is not set."}
            }),
            vec![],
        ),
        tool(
            "seatsurfing_logout",
            "Forget the current Seatsurfing session. Other tools fail until the next login.",
            json!({}),
            vec![],
        ),

        // =========================================================================
        // Locations and spaces
        // =========================================================================
        tool(
            "seatsurfing_list_locations",
            "List all available locations (buildings/floors) where spaces can be booked.",
            json!({}),
            vec![],
        ),
        tool(
            "seatsurfing_list_spaces",
            "List all spaces (desks/rooms) in a specific location.",
            json!({
                "location_id": {"type": "string", "description": "ID of the location. Use seatsurfing_list_locations to get IDs."}
            }),
            vec!["location_id"],
        ),
        tool(
            "seatsurfing_check_availability",
            "Check which spaces are available in a location for a specific time period.",
            json!({
                "location_id": {"type": "string", "description": "ID of the location to check."},
                "start_time": {"type": "string", "description": "Start time (ISO format or YYYY-MM-DD HH:MM)."},
                "end_time": {"type": "string", "description": "End time (ISO format or YYYY-MM-DD HH:MM)."}
            }),
            vec!["location_id", "start_time", "end_time"],
        ),
        tool(
            "seatsurfing_view_availability",
            "List all spaces in a location grouped by availability status for a given time period. Uses the local spaces cache.",
            json!({
                "location_id": {"type": "string", "description": "ID of the location. Use seatsurfing_list_locations to get IDs."},
                "start_time": {"type": "string", "description": "Start time to check availability (YYYY-MM-DD HH:MM)."},
                "end_time": {"type": "string", "description": "End time to check availability (YYYY-MM-DD HH:MM)."}
            }),
            vec!["location_id"],
        ),
        tool(
            "seatsurfing_refresh_spaces",
            "Refresh the cached list of locations and bookable spaces. Run this after setup or when spaces have changed.",
            json!({}),
            vec![],
        ),

        // =========================================================================
        // Bookings
        // =========================================================================
        tool(
            "seatsurfing_create_booking",
            "Create a new booking for a space (desk/room) at a specific time.",
            json!({
                "space_id": {"type": "string", "description": "ID of the space to book. Use seatsurfing_check_availability to find available spaces."},
                "start_time": {"type": "string", "description": "Start time of the booking (YYYY-MM-DD HH:MM)."},
                "end_time": {"type": "string", "description": "End time of the booking (YYYY-MM-DD HH:MM)."},
                "subject": {"type": "string", "description": "Optional subject/reason for the booking."}
            }),
            vec!["space_id", "start_time", "end_time"],
        ),
        tool(
            "seatsurfing_list_my_bookings",
            "List all upcoming bookings for the current user.",
            json!({}),
            vec![],
        ),
        tool(
            "seatsurfing_cancel_booking",
            "Cancel an existing booking by its ID.",
            json!({
                "booking_id": {"type": "string", "description": "ID of the booking to cancel. Use seatsurfing_list_my_bookings to find IDs."}
            }),
            vec!["booking_id"],
        ),
    ]
}
