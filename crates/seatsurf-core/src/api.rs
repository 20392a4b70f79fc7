//! Typed calls against the Seatsurfing REST API
//!
//! Every call passes the session's authentication gate first. Success
//! semantics are per endpoint: reads and deletes accept any 2xx, booking
//! creation only accepts 201.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::gateway::Method;
use crate::session::SessionManager;

/// Response header carrying the id of a created object
pub const OBJECT_ID_HEADER: &str = "X-Object-ID";

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpaceAvailability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookedSpace {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub space: Option<BookedSpace>,
    pub enter: String,
    pub leave: String,
    #[serde(default)]
    pub subject: String,
}

impl Booking {
    /// Space name, falling back to the space id
    pub fn space_label(&self) -> &str {
        match &self.space {
            Some(space) if !space.name.is_empty() => space.name.as_str(),
            _ if !self.space_id.is_empty() => self.space_id.as_str(),
            _ => "Unknown",
        }
    }
}

/// Parameters for a new booking; times already normalized
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub space_id: String,
    pub enter: String,
    pub leave: String,
    pub subject: String,
}

/// Spaces split by their availability flag, order preserved
#[derive(Debug, Clone, Default)]
pub struct AvailabilityPartition {
    pub available: Vec<SpaceAvailability>,
    pub occupied: Vec<SpaceAvailability>,
}

impl AvailabilityPartition {
    pub fn partition(spaces: Vec<SpaceAvailability>) -> Self {
        let (available, occupied) = spaces.into_iter().partition(|s| s.available);
        Self {
            available,
            occupied,
        }
    }
}

impl SessionManager {
    pub async fn get_me(&self) -> Result<User> {
        self.send(Method::GET, "/user/me", None)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn locations(&self) -> Result<Vec<Location>> {
        self.send(Method::GET, "/location/", None)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn spaces(&self, location_id: &str) -> Result<Vec<Space>> {
        let path = format!("/location/{}/space/", urlencoding::encode(location_id));
        self.send(Method::GET, &path, None)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn space_availability(
        &self,
        location_id: &str,
        enter: &str,
        leave: &str,
    ) -> Result<Vec<SpaceAvailability>> {
        let path = format!(
            "/location/{}/space/availability?enter={}&leave={}",
            urlencoding::encode(location_id),
            urlencoding::encode(enter),
            urlencoding::encode(leave),
        );
        self.send(Method::GET, &path, None)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn my_bookings(&self) -> Result<Vec<Booking>> {
        self.send(Method::GET, "/booking/", None)
            .await?
            .error_for_status()?
            .json()
    }

    /// Create a booking and return its id
    pub async fn create_booking(&self, booking: &NewBooking) -> Result<String> {
        let body = json!({
            "spaceId": booking.space_id,
            "enter": booking.enter,
            "leave": booking.leave,
            "subject": booking.subject,
            "userEmail": "",
        });
        let response = self.send(Method::POST, "/booking/", Some(&body)).await?;

        if response.status != StatusCode::CREATED {
            return Err(Error::BookingRejected {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        Ok(response
            .header(OBJECT_ID_HEADER)
            .unwrap_or("created")
            .to_string())
    }

    pub async fn delete_booking(&self, booking_id: &str) -> Result<()> {
        let path = format!("/booking/{}", urlencoding::encode(booking_id));
        self.send(Method::DELETE, &path, None)
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::logged_in;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn new_booking() -> NewBooking {
        NewBooking {
            space_id: "space-7".to_string(),
            enter: "2025-06-01T09:00:00.000Z".to_string(),
            leave: "2025-06-01T17:00:00.000Z".to_string(),
            subject: "Focus day".to_string(),
        }
    }

    #[test]
    fn test_partition_preserves_order() {
        let flags = [true, false, true, true, false];
        let spaces = flags
            .iter()
            .enumerate()
            .map(|(i, available)| SpaceAvailability {
                id: (i + 1).to_string(),
                name: format!("Desk {}", i + 1),
                available: *available,
            })
            .collect();

        let split = AvailabilityPartition::partition(spaces);
        let available: Vec<&str> = split.available.iter().map(|s| s.id.as_str()).collect();
        let occupied: Vec<&str> = split.occupied.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(available, vec!["1", "3", "4"]);
        assert_eq!(occupied, vec!["2", "5"]);
        assert_eq!(split.available.len(), 3);
        assert_eq!(split.occupied.len(), 2);
    }

    #[test]
    fn test_missing_available_flag_means_occupied() {
        let spaces: Vec<SpaceAvailability> =
            serde_json::from_str(r#"[{"id": "1", "name": "Desk", "x": 10}]"#).unwrap();
        assert!(!spaces[0].available);
    }

    #[test]
    fn test_booking_space_label_fallback() {
        let bookings: Vec<Booking> = serde_json::from_str(
            r#"[
                {"id": "b1", "spaceId": "s1", "space": {"name": "Window desk"}, "enter": "e", "leave": "l"},
                {"id": "b2", "spaceId": "s2", "enter": "e", "leave": "l"},
                {"id": "b3", "enter": "e", "leave": "l"}
            ]"#,
        )
        .unwrap();

        assert_eq!(bookings[0].space_label(), "Window desk");
        assert_eq!(bookings[1].space_label(), "s2");
        assert_eq!(bookings[2].space_label(), "Unknown");
    }

    #[tokio::test]
    async fn test_create_booking_requires_201() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/booking/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .mount(&mock_server)
            .await;

        let session = logged_in(&mock_server).await;
        let result = session.create_booking(&new_booking()).await;

        match result {
            Err(Error::BookingRejected { status, body }) => {
                assert_eq!(status, 200);
                assert_eq!(body, "{\"ok\":true}");
            }
            other => panic!("expected BookingRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_booking_returns_object_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/booking/"))
            .and(header("Authorization", "Bearer access-1"))
            .and(body_json(json!({
                "spaceId": "space-7",
                "enter": "2025-06-01T09:00:00.000Z",
                "leave": "2025-06-01T17:00:00.000Z",
                "subject": "Focus day",
                "userEmail": ""
            })))
            .respond_with(ResponseTemplate::new(201).insert_header("X-Object-ID", "booking-99"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = logged_in(&mock_server).await;
        let id = session.create_booking(&new_booking()).await.unwrap();
        assert_eq!(id, "booking-99");
    }

    #[tokio::test]
    async fn test_create_booking_without_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/booking/"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&mock_server)
            .await;

        let session = logged_in(&mock_server).await;
        assert_eq!(session.create_booking(&new_booking()).await.unwrap(), "created");
    }

    #[tokio::test]
    async fn test_delete_booking_accepts_any_2xx() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/booking/b-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/booking/b-2"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such booking"))
            .mount(&mock_server)
            .await;

        let session = logged_in(&mock_server).await;
        session.delete_booking("b-1").await.unwrap();

        let result = session.delete_booking("b-2").await;
        assert!(matches!(result, Err(Error::RemoteRequest { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_availability_query_parameters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/location/loc-1/space/availability"))
            .and(query_param("enter", "2025-06-01T09:00:00.000Z"))
            .and(query_param("leave", "2025-06-01T17:00:00.000Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "name": "A", "available": true},
                {"id": "2", "name": "B", "available": false}
            ])))
            .mount(&mock_server)
            .await;

        let session = logged_in(&mock_server).await;
        let spaces = session
            .space_availability("loc-1", "2025-06-01T09:00:00.000Z", "2025-06-01T17:00:00.000Z")
            .await
            .unwrap();

        assert_eq!(spaces.len(), 2);
        assert!(spaces[0].available);
    }

    #[tokio::test]
    async fn test_calls_require_session() {
        let session = SessionManager::new();
        assert!(matches!(session.locations().await, Err(Error::NotAuthenticated)));
        assert!(matches!(session.my_bookings().await, Err(Error::NotAuthenticated)));
    }
}
