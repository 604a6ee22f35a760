use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const SESSION_KEY: &str = "session";
pub const ACTIVE_MENU_KEY: &str = "menu:active";
pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown value '{}'", self.0)
    }
}

// Enums stored as VARCHAR columns. The string form is also the JSON form.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant(other.to_owned())),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum!(UserType {
    Registered => "registered",
    Vip => "vip",
    Manager => "manager",
    Chef => "chef",
    Delivery => "delivery",
});

impl UserType {
    pub fn is_customer(&self) -> bool {
        matches!(self, UserType::Registered | UserType::Vip)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, UserType::Chef | UserType::Delivery)
    }
}

string_enum!(OrderStatus {
    Pending => "pending",
    Preparing => "preparing",
    Ready => "ready",
    Delivering => "delivering",
    Delivered => "delivered",
});

impl OrderStatus {
    pub fn is_final(&self) -> bool {
        *self == OrderStatus::Delivered
    }

    /// Title-cased label used by order history listings.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivering => "Delivering",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

string_enum!(ComplaintStatus {
    Pending => "pending",
    Disputed => "disputed",
    Upheld => "upheld",
    Dismissed => "dismissed",
});

impl ComplaintStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, ComplaintStatus::Pending | ComplaintStatus::Disputed)
    }
}

string_enum!(ComplimentStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

string_enum!(TargetType {
    Chef => "chef",
    Delivery => "delivery",
    Customer => "customer",
});

string_enum!(EmployeeType {
    Chef => "chef",
    Delivery => "delivery",
});

impl From<EmployeeType> for UserType {
    fn from(value: EmployeeType) -> Self {
        match value {
            EmployeeType::Chef => UserType::Chef,
            EmployeeType::Delivery => UserType::Delivery,
        }
    }
}

impl From<EmployeeType> for TargetType {
    fn from(value: EmployeeType) -> Self {
        match value {
            EmployeeType::Chef => TargetType::Chef,
            EmployeeType::Delivery => TargetType::Delivery,
        }
    }
}

string_enum!(RegistrationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

string_enum!(TransactionType {
    Deposit => "deposit",
    OrderPayment => "order_payment",
    AccountClosure => "account_closure",
    Bonus => "bonus",
});

string_enum!(TopicType {
    General => "general",
    Chef => "chef",
    Dish => "dish",
    Delivery => "delivery",
});

/// Converts a dollar amount from a request body into cents.
pub fn dollars_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// `serialize_with` helper for cent columns exposed as dollars.
pub fn as_dollars<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(cents_to_dollars(*cents))
}

pub fn average(sum: i64, count: i64) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some((sum as f64 / count as f64 * 100.0).round() / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enums_case_insensitively() {
        assert_eq!("VIP".parse::<UserType>(), Ok(UserType::Vip));
        assert_eq!(" delivering ".parse::<OrderStatus>(), Ok(OrderStatus::Delivering));
        assert!("cook".parse::<EmployeeType>().is_err());
    }

    #[test]
    fn enums_use_lowercase_json() {
        let json = serde_json::to_string(&ComplaintStatus::Disputed).unwrap();
        assert_eq!(json, "\"disputed\"");

        let parsed: TargetType = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(parsed, TargetType::Customer);
        assert!(serde_json::from_str::<TargetType>("\"manager\"").is_err());
    }

    #[test]
    fn converts_money() {
        assert_eq!(dollars_to_cents(12.99), 1299);
        assert_eq!(dollars_to_cents(25.5), 2550);
        assert_eq!(cents_to_dollars(10050), 100.5);
    }

    #[test]
    fn averages_round_to_two_places() {
        assert_eq!(average(0, 0), None);
        assert_eq!(average(10, 3), Some(3.33));
        assert_eq!(average(9, 2), Some(4.5));
    }

    #[test]
    fn customer_and_staff_roles() {
        assert!(UserType::Vip.is_customer());
        assert!(!UserType::Manager.is_customer());
        assert!(UserType::Delivery.is_staff());
        assert_eq!(UserType::from(EmployeeType::Chef), UserType::Chef);
    }
}
