use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Agency, Notification, Occurrence, Profile, StatusEntry, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_id: i32,
    pub profile: String,
    pub points: i32,
    pub rejection_streak_count: i32,
    pub is_blocked: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            avatar_url: user.avatar_url,
            profile_id: user.profile_id,
            profile: user.role.name().to_string(),
            points: user.points,
            rejection_streak_count: user.rejection_streak,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RankingEntryDto {
    pub position: usize,
    pub user_id: i32,
    pub name: String,
    pub avatar_url: Option<String>,
    pub points: i32,
}

#[derive(Debug, Serialize)]
pub struct OccurrenceDto {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub address: String,
    pub registered_on: NaiveDate,
    pub finalized_on: Option<NaiveDate>,
    pub status_id: i32,
    pub status: String,
    pub user_id: i32,
    pub reporter_name: String,
    pub agency_id: Option<i32>,
    pub agency_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub point_type: Option<String>,
    pub rejection_justification: Option<String>,
}

impl From<Occurrence> for OccurrenceDto {
    fn from(o: Occurrence) -> Self {
        Self {
            id: o.id,
            title: o.title,
            description: o.description,
            address: o.address,
            registered_on: o.registered_on,
            finalized_on: o.finalized_on,
            status_id: o.status_id,
            status: o.status_name,
            user_id: o.user_id,
            reporter_name: o.reporter_name,
            agency_id: o.agency_id,
            agency_name: o.agency_name,
            latitude: o.latitude,
            longitude: o.longitude,
            images: o.image_urls,
            point_type: o.point_type,
            rejection_justification: o.rejection_justification,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationDto {
    pub id: i32,
    pub message: String,
    pub sent_at: String,
    pub recipient_email: Option<String>,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            message: n.message,
            sent_at: n.sent_at,
            recipient_email: n.recipient_email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgencyDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<Agency> for AgencyDto {
    fn from(a: Agency) -> Self {
        Self {
            id: a.id,
            name: a.name,
            email: a.email,
            phone: a.phone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusDto {
    pub id: i32,
    pub name: String,
}

impl From<StatusEntry> for StatusDto {
    fn from(entry: StatusEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.status.name().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileDto {
    pub id: i32,
    pub name: String,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            name: p.name,
        }
    }
}
