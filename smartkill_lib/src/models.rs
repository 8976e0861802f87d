//! Domain entities returned by the Smart-Kill API and their mapping tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MappingError;
use crate::helpers::resource_id_from_url;
use crate::schema::FieldType::{
    Boolean, CodeLabelList, DateTime as Timestamp, Float, Id, Integer, List, Nested, NestedList,
    Opaque, Text,
};
use crate::schema::{Entity, EntitySchema, FieldSpec};

/// Free-form JSON the service does not describe (kill details, floor plan ids, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueJson(pub Value);

/// An entity served from its own collection endpoint.
pub trait Resource: Entity {
    /// Collection name, e.g. `traps`.
    const COLLECTION: &'static str;

    fn collection_path() -> String {
        format!("{}/", Self::COLLECTION)
    }

    fn item_path(id: u64) -> String {
        format!("{}/{}/", Self::COLLECTION, id)
    }
}

/// Raw temperature units are twentieths of a degree Celsius.
fn celsius(raw: i64) -> f64 {
    let degrees = raw as f64 / 20.0;
    // Decimal rounding of the exact binary value, ties to even.
    format!("{:.1}", degrees).parse().unwrap_or(degrees)
}

// ===== Activity =====

/// A trap activity log record (kill, maintenance, status report).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub url: String,
    /// URL of the trap this record belongs to.
    pub trap: String,
    pub trap_name: String,
    pub time_stamp: DateTime<Utc>,
    pub time_stamp_unix: DateTime<Utc>,
    pub sequence_number: i64,
    pub activity_type: i64,
    pub activity_type_text: String,
    pub kills_present: i64,
    pub total_kills_reported: i64,
    pub battery_level: i64,
    pub wireless_network_rssi: i64,
    pub firmware_version_string: String,
    pub temperature: i64,
    pub board_type: String,
    pub error_code: i64,
    pub active: bool,
    pub is_rat_kill: bool,
    pub sex_kill_detail: Option<OpaqueJson>,
    pub age_kill_detail: Option<OpaqueJson>,
    pub species_kill_detail: Option<OpaqueJson>,
    pub replaced_attractant: bool,
    pub replaced_battery: bool,
    pub cleaned_trap: bool,
    pub note: Option<OpaqueJson>,
    pub site_id: Option<OpaqueJson>,
    pub building_id: Option<OpaqueJson>,
    pub floor_id: Option<OpaqueJson>,
    pub floor_plan_x: Option<OpaqueJson>,
    pub floor_plan_y: Option<OpaqueJson>,
    pub trap_type_text: String,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static ACTIVITY: EntitySchema = EntitySchema {
    name: "Activity",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("url", Text),
        FieldSpec::new("trap", Text),
        FieldSpec::new("trap_name", Text),
        FieldSpec::new("time_stamp", Timestamp),
        FieldSpec::new("time_stamp_unix", Timestamp),
        FieldSpec::new("sequence_number", Integer),
        FieldSpec::new("activity_type", Integer),
        FieldSpec::new("activity_type_text", Text),
        FieldSpec::new("kills_present", Integer),
        FieldSpec::new("total_kills_reported", Integer),
        FieldSpec::new("battery_level", Integer),
        FieldSpec::new("wireless_network_rssi", Integer),
        FieldSpec::new("firmware_version_string", Text),
        FieldSpec::new("temperature", Integer),
        FieldSpec::new("board_type", Text),
        FieldSpec::new("error_code", Integer),
        FieldSpec::new("active", Boolean),
        FieldSpec::new("is_rat_kill", Boolean).from_key("isRatKill"),
        FieldSpec::new("sex_kill_detail", Opaque).from_key("sexKillDetail").nullable(),
        FieldSpec::new("age_kill_detail", Opaque).from_key("ageKillDetail").nullable(),
        FieldSpec::new("species_kill_detail", Opaque).from_key("speciesKillDetail").nullable(),
        FieldSpec::new("replaced_attractant", Boolean).from_key("replacedAttractant"),
        FieldSpec::new("replaced_battery", Boolean).from_key("replacedBattery"),
        FieldSpec::new("cleaned_trap", Boolean).from_key("cleanedTrap"),
        FieldSpec::new("note", Opaque).nullable(),
        FieldSpec::new("site_id", Opaque).nullable(),
        FieldSpec::new("building_id", Opaque).nullable(),
        FieldSpec::new("floor_id", Opaque).nullable(),
        FieldSpec::new("floor_plan_x", Opaque).nullable(),
        FieldSpec::new("floor_plan_y", Opaque).nullable(),
        FieldSpec::new("trap_type_text", Text),
    ],
};

impl Activity {
    pub fn temperature_celcius(&self) -> f64 {
        celsius(self.temperature)
    }

    /// Id of the referenced trap, taken from its URL.
    pub fn trap_id(&self) -> Option<u64> {
        resource_id_from_url(&self.trap)
    }
}

impl Entity for Activity {
    fn schema() -> &'static EntitySchema {
        &ACTIVITY
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

impl Resource for Activity {
    const COLLECTION: &'static str = "activitylogs";
}

// ===== MobileApp =====

/// Minimum and recommended mobile app versions per platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileApp {
    pub url: String,
    pub min_android_version: i64,
    pub ideal_android_version: i64,
    pub min_ios_version: String,
    pub ideal_ios_version: String,
    pub commercial_min_android_version: i64,
    pub commercial_ideal_android_version: i64,
    pub commercial_min_ios_version: String,
    pub commercial_ideal_ios_version: String,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static MOBILE_APP: EntitySchema = EntitySchema {
    name: "MobileApp",
    fields: &[
        FieldSpec::new("url", Text),
        FieldSpec::new("min_android_version", Integer),
        FieldSpec::new("ideal_android_version", Integer),
        FieldSpec::new("min_ios_version", Text),
        FieldSpec::new("ideal_ios_version", Text),
        FieldSpec::new("commercial_min_android_version", Integer),
        FieldSpec::new("commercial_ideal_android_version", Integer),
        FieldSpec::new("commercial_min_ios_version", Text),
        FieldSpec::new("commercial_ideal_ios_version", Text),
    ],
};

impl Entity for MobileApp {
    fn schema() -> &'static EntitySchema {
        &MOBILE_APP
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

impl Resource for MobileApp {
    const COLLECTION: &'static str = "mobileapps";
}

// ===== Profile =====

/// Notification settings and device registrations of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub url: String,
    /// URL of the owning user.
    pub user: String,
    pub name: Option<String>,
    pub operator: String,
    pub operator_name: String,
    pub client: Option<String>,
    pub client_name: Option<String>,
    pub telephone_number: String,
    pub phone_names: Option<OpaqueJson>,
    pub phone_numbers: Option<OpaqueJson>,
    pub email_addresses: Option<OpaqueJson>,
    pub email_notifications_enabled: bool,
    pub notifications_enabled: bool,
    pub terms_version: i64,
    pub notify_wifi_connection: bool,
    pub notify_low_battery: bool,
    pub notify_kill_alerts: bool,
    pub notify_new_products: bool,
    pub text_notifications_enabled: bool,
    pub notify_empty_trap: bool,
    pub fcm_tokens: Option<OpaqueJson>,
    pub apns_tokens: Option<OpaqueJson>,
    pub fcm_arns: Option<OpaqueJson>,
    pub apns_arns: Option<OpaqueJson>,
    pub fcm_tokens_pro: Option<OpaqueJson>,
    pub apns_tokens_pro: Option<OpaqueJson>,
    pub fcm_arns_pro: Option<OpaqueJson>,
    pub apns_arns_pro: Option<OpaqueJson>,
    pub favorite_sites: Option<OpaqueJson>,
    pub notify_false_trigger: bool,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static PROFILE: EntitySchema = EntitySchema {
    name: "Profile",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("url", Text),
        FieldSpec::new("user", Text),
        FieldSpec::new("name", Text).nullable(),
        FieldSpec::new("operator", Text),
        FieldSpec::new("operator_name", Text),
        FieldSpec::new("client", Text).nullable(),
        FieldSpec::new("client_name", Text).nullable(),
        FieldSpec::new("telephone_number", Text),
        FieldSpec::new("phone_names", Opaque).from_key("phoneNames").nullable(),
        FieldSpec::new("phone_numbers", Opaque).from_key("phoneNumbers").nullable(),
        FieldSpec::new("email_addresses", Opaque).from_key("emailAddresses").nullable(),
        FieldSpec::new("email_notifications_enabled", Boolean),
        FieldSpec::new("notifications_enabled", Boolean),
        FieldSpec::new("terms_version", Integer),
        FieldSpec::new("notify_wifi_connection", Boolean),
        FieldSpec::new("notify_low_battery", Boolean),
        FieldSpec::new("notify_kill_alerts", Boolean),
        FieldSpec::new("notify_new_products", Boolean),
        FieldSpec::new("text_notifications_enabled", Boolean),
        FieldSpec::new("notify_empty_trap", Boolean),
        FieldSpec::new("fcm_tokens", Opaque).from_key("fcmTokens").nullable(),
        FieldSpec::new("apns_tokens", Opaque).from_key("apnsTokens").nullable(),
        FieldSpec::new("fcm_arns", Opaque).from_key("fcmARNs").nullable(),
        FieldSpec::new("apns_arns", Opaque).from_key("apnsARNs").nullable(),
        FieldSpec::new("fcm_tokens_pro", Opaque).from_key("fcmTokensPro").nullable(),
        FieldSpec::new("apns_tokens_pro", Opaque).from_key("apnsTokensPro").nullable(),
        FieldSpec::new("fcm_arns_pro", Opaque).from_key("fcmARNsPro").nullable(),
        FieldSpec::new("apns_arns_pro", Opaque).from_key("apnsARNsPro").nullable(),
        FieldSpec::new("favorite_sites", Opaque).nullable(),
        FieldSpec::new("notify_false_trigger", Boolean),
    ],
};

impl Entity for Profile {
    fn schema() -> &'static EntitySchema {
        &PROFILE
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

impl Resource for Profile {
    const COLLECTION: &'static str = "profiles";
}

// ===== User =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub url: String,
    pub username: String,
    /// Value as served by the API (not the account password used to log in).
    pub password: String,
    pub email: String,
    pub groups: Vec<String>,
    pub group_names: Vec<String>,
    pub date_joined: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub profile: Profile,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static USER: EntitySchema = EntitySchema {
    name: "User",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("url", Text),
        FieldSpec::new("username", Text),
        FieldSpec::new("password", Text),
        FieldSpec::new("email", Text),
        FieldSpec::new("groups", List(&Text)),
        FieldSpec::new("group_names", List(&Text)),
        FieldSpec::new("date_joined", Timestamp),
        FieldSpec::new("last_login", Timestamp),
        FieldSpec::new("first_name", Text),
        FieldSpec::new("last_name", Text),
        FieldSpec::new("profile", Nested(&PROFILE)),
    ],
};

impl Entity for User {
    fn schema() -> &'static EntitySchema {
        &USER
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
}

// ===== Operator =====

/// A versioned terms-and-conditions text accepted by an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAndConditions {
    pub id: u64,
    pub operator_id: i64,
    pub time_stamp: DateTime<Utc>,
    pub text: String,
    pub version: String,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static TERMS_AND_CONDITIONS: EntitySchema = EntitySchema {
    name: "TermsAndConditions",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("operator_id", Integer),
        FieldSpec::new("time_stamp", Timestamp),
        FieldSpec::new("text", Text).from_key("terms_and_conditions"),
        FieldSpec::new("version", Text).from_key("terms_version"),
    ],
};

impl Entity for TermsAndConditions {
    fn schema() -> &'static EntitySchema {
        &TERMS_AND_CONDITIONS
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

/// A pest-control operator account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: u64,
    pub url: String,
    pub account_number: String,
    pub name: String,
    pub address: String,
    pub operator_type: i64,
    pub number_sites: i64,
    pub number_buildings: i64,
    pub number_traps: i64,
    pub terms_version: i64,
    pub terms: String,
    pub contact: User,
    pub terms_and_conditions: Option<Vec<TermsAndConditions>>,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static OPERATOR: EntitySchema = EntitySchema {
    name: "Operator",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("url", Text),
        FieldSpec::new("account_number", Text),
        FieldSpec::new("name", Text),
        FieldSpec::new("address", Text),
        FieldSpec::new("operator_type", Integer).from_key("type"),
        FieldSpec::new("number_sites", Integer),
        FieldSpec::new("number_buildings", Integer),
        FieldSpec::new("number_traps", Integer),
        FieldSpec::new("terms_version", Integer),
        FieldSpec::new("terms", Text),
        FieldSpec::new("contact", Nested(&USER)),
        FieldSpec::new("terms_and_conditions", NestedList(&TERMS_AND_CONDITIONS)).nullable(),
    ],
};

impl Entity for Operator {
    fn schema() -> &'static EntitySchema {
        &OPERATOR
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

impl Resource for Operator {
    const COLLECTION: &'static str = "operators";
}

// ===== Trap =====

/// Latest statistics reported by a trap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapStatistics {
    pub id: u64,
    pub url: String,
    /// URL of the trap.
    pub trap: String,
    pub trap_name: String,
    pub kills_present: i64,
    pub install_date: DateTime<Utc>,
    pub owner_name: String,
    pub owner_email: String,
    pub last_report_date: DateTime<Utc>,
    pub last_kill_date: Option<DateTime<Utc>>,
    /// Raw sensor units, see [`TrapStatistics::temperature_celcius`].
    pub temperature: i64,
    pub battery_level: i64,
    pub total_kills: Option<i64>,
    pub total_escapes: Option<i64>,
    pub rx_power_level: i64,
    pub firmware_version: String,
    pub trap_provisioned: bool,
    pub last_sequence_number: Option<i64>,
    pub total_retreats: Option<i64>,
    pub wireless_network_rssi: i64,
    pub error_code: i64,
    pub send_conn_lost_nt: bool,
    pub send_empty_trap_nt: bool,
    pub board_type: String,
    /// Served either as a date or as free text; kept verbatim.
    pub last_maintenance_date: String,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static TRAP_STATISTICS: EntitySchema = EntitySchema {
    name: "TrapStatistics",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("url", Text),
        FieldSpec::new("trap", Text),
        FieldSpec::new("trap_name", Text),
        FieldSpec::new("kills_present", Integer),
        FieldSpec::new("install_date", Timestamp),
        FieldSpec::new("owner_name", Text),
        FieldSpec::new("owner_email", Text),
        FieldSpec::new("last_report_date", Timestamp),
        FieldSpec::new("last_kill_date", Timestamp).nullable(),
        FieldSpec::new("temperature", Integer),
        FieldSpec::new("battery_level", Integer),
        FieldSpec::new("total_kills", Integer).nullable(),
        FieldSpec::new("total_escapes", Integer).nullable(),
        FieldSpec::new("rx_power_level", Integer),
        FieldSpec::new("firmware_version", Text),
        FieldSpec::new("trap_provisioned", Boolean),
        FieldSpec::new("last_sequence_number", Integer).nullable(),
        FieldSpec::new("total_retreats", Integer).nullable(),
        FieldSpec::new("wireless_network_rssi", Integer),
        FieldSpec::new("error_code", Integer),
        FieldSpec::new("send_conn_lost_nt", Boolean),
        FieldSpec::new("send_empty_trap_nt", Boolean),
        FieldSpec::new("board_type", Text),
        FieldSpec::new("last_maintenance_date", Text),
    ],
};

impl TrapStatistics {
    pub fn temperature_celcius(&self) -> f64 {
        celsius(self.temperature)
    }

    pub fn trap_id(&self) -> Option<u64> {
        resource_id_from_url(&self.trap)
    }
}

impl Entity for TrapStatistics {
    fn schema() -> &'static EntitySchema {
        &TRAP_STATISTICS
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }
}

/// A Smart-Kill trap with its embedded statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trap {
    pub id: u64,
    pub url: String,
    pub corruption_status: i64,
    /// Valid `corruption_status` codes with their labels, in server order.
    pub corruption_status_options: Option<Vec<(i64, String)>>,
    pub operator: Option<String>,
    pub operator_name: Option<String>,
    pub name: String,
    pub ssid: String,
    pub serial_number: String,
    pub auto_upgrade: bool,
    pub status: i64,
    pub location: String,
    pub lat: f64,
    pub long: f64,
    pub upgrade_firmware: Option<String>,
    pub commercial_gateway: Option<String>,
    pub commercial_monitor_mode_enabled: bool,
    pub lorawan_app_key: String,
    pub site_name: Option<String>,
    pub floor_plan_x: i64,
    pub floor_plan_y: i64,
    pub building_name: Option<String>,
    pub floor_name: Option<String>,
    pub room: Option<String>,
    pub room_name: Option<String>,
    pub trap_type: i64,
    pub trap_type_verbose: String,
    pub alerts: i64,
    pub trapstatistics: TrapStatistics,
    #[serde(rename = "_unknown", default, skip_serializing)]
    unknown: Map<String, Value>,
}

pub static TRAP: EntitySchema = EntitySchema {
    name: "Trap",
    fields: &[
        FieldSpec::new("id", Id),
        FieldSpec::new("url", Text),
        FieldSpec::new("corruption_status", Integer),
        FieldSpec::new("corruption_status_options", CodeLabelList).nullable(),
        FieldSpec::new("operator", Text).nullable(),
        FieldSpec::new("operator_name", Text).nullable(),
        FieldSpec::new("name", Text),
        FieldSpec::new("ssid", Text),
        FieldSpec::new("serial_number", Text),
        FieldSpec::new("auto_upgrade", Boolean),
        FieldSpec::new("status", Integer),
        FieldSpec::new("location", Text),
        FieldSpec::new("lat", Float),
        FieldSpec::new("long", Float),
        FieldSpec::new("upgrade_firmware", Text).nullable(),
        FieldSpec::new("commercial_gateway", Text).nullable(),
        FieldSpec::new("commercial_monitor_mode_enabled", Boolean),
        FieldSpec::new("lorawan_app_key", Text),
        FieldSpec::new("site_name", Text).nullable(),
        FieldSpec::new("floor_plan_x", Integer),
        FieldSpec::new("floor_plan_y", Integer),
        FieldSpec::new("building_name", Text).nullable(),
        FieldSpec::new("floor_name", Text).nullable(),
        FieldSpec::new("room", Text).nullable(),
        FieldSpec::new("room_name", Text).nullable(),
        FieldSpec::new("trap_type", Integer),
        FieldSpec::new("trap_type_verbose", Text),
        FieldSpec::new("alerts", Integer),
        FieldSpec::new("trapstatistics", Nested(&TRAP_STATISTICS)),
    ],
};

impl Trap {
    /// Label paired with `corruption_status`, if the trap lists its options.
    pub fn corruption_status_verbose(&self) -> Option<&str> {
        self.corruption_status_options
            .as_deref()?
            .iter()
            .find(|(code, _)| *code == self.corruption_status)
            .map(|(_, label)| label.as_str())
    }
}

impl Entity for Trap {
    fn schema() -> &'static EntitySchema {
        &TRAP
    }

    fn unknown_fields(&self) -> &Map<String, Value> {
        &self.unknown
    }

    /// `corruption_status` must match exactly one listed option.
    fn validate(&self) -> Result<(), MappingError> {
        let Some(options) = self.corruption_status_options.as_deref() else {
            return Ok(());
        };
        if options.is_empty() {
            return Ok(());
        }
        let matches = options
            .iter()
            .filter(|(code, _)| *code == self.corruption_status)
            .count();
        if matches == 1 {
            Ok(())
        } else {
            Err(MappingError::field(
                "corruption_status",
                &format!("expected exactly one matching option, found {}", matches),
                Some(&Value::from(self.corruption_status)),
            ))
        }
    }
}

impl Resource for Trap {
    const COLLECTION: &'static str = "traps";
}
