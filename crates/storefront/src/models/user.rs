//! User and address domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hey_harvest_core::validation::{validate_mobile_number, validate_pincode};
use hey_harvest_core::{AddressId, AddressType, Email, UserId, UserRole};

use super::CurrentUser;

/// A storefront account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Identity to store in the session.
    #[must_use]
    pub fn to_current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// A customer row in the back-office list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub order_count: u64,
    /// Sum of paid order totals.
    pub lifetime_spend: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Postal details shared by saved addresses and order snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl AddressDetails {
    /// Check required fields, pincode and mobile number.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message describing the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        let required = [
            &self.full_name,
            &self.line1,
            &self.city,
            &self.state,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err("Name, address line, city and state are required");
        }
        if !validate_pincode(self.pincode.trim()) {
            return Err("Please enter a valid 6-digit pincode");
        }
        if !validate_mobile_number(self.phone.trim()) {
            return Err("Please enter a valid 10-digit mobile number");
        }
        Ok(())
    }
}

/// A saved address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(flatten)]
    pub details: AddressDetails,
    pub address_type: AddressType,
    pub is_default: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details() -> AddressDetails {
        AddressDetails {
            full_name: "Asha Kumari".to_string(),
            phone: "9876543210".to_string(),
            line1: "12 Station Road".to_string(),
            line2: None,
            landmark: Some("Near Makhana Mandi".to_string()),
            city: "Darbhanga".to_string(),
            state: "Bihar".to_string(),
            pincode: "846004".to_string(),
        }
    }

    #[test]
    fn test_valid_address() {
        assert_eq!(details().validate(), Ok(()));
    }

    #[test]
    fn test_invalid_pincode_and_phone() {
        let bad_pin = AddressDetails {
            pincode: "046004".to_string(),
            ..details()
        };
        assert!(bad_pin.validate().unwrap_err().contains("pincode"));

        let bad_phone = AddressDetails {
            phone: "12345".to_string(),
            ..details()
        };
        assert!(bad_phone.validate().unwrap_err().contains("mobile"));
    }

    #[test]
    fn test_missing_required_field() {
        let blank = AddressDetails {
            city: "  ".to_string(),
            ..details()
        };
        assert!(blank.validate().is_err());
    }
}
