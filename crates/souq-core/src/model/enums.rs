//! Categorical values shared by the raw and clean layers.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Declares a closed set of labelled values with a case-insensitive parser.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            /// Display label, as written to exports.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Match a label ignoring ASCII case and surrounding whitespace.
            pub fn from_label(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                $(
                    if raw.eq_ignore_ascii_case($label) {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum! {
    /// Product category.
    pub enum Category {
        Electronics => "Electronics",
        Fashion => "Fashion",
        Grocery => "Grocery",
        HomeGarden => "Home & Garden",
        Beauty => "Beauty",
        Sports => "Sports",
        /// Value that did not match any known category.
        Unknown => "Unknown",
    }
}

impl Category {
    /// The six real categories, in catalogue order.
    pub const KNOWN: [Category; 6] = [
        Category::Electronics,
        Category::Fashion,
        Category::Grocery,
        Category::HomeGarden,
        Category::Beauty,
        Category::Sports,
    ];
}

label_enum! {
    /// Sales channel of a store.
    pub enum Channel {
        App => "App",
        Web => "Web",
        Marketplace => "Marketplace",
        Unknown => "Unknown",
    }
}

impl Channel {
    pub const KNOWN: [Channel; 3] = [Channel::App, Channel::Web, Channel::Marketplace];
}

label_enum! {
    /// Canonical city. `Unknown` is the explicit fallback for unmapped spellings.
    pub enum City {
        Dubai => "Dubai",
        AbuDhabi => "Abu Dhabi",
        Sharjah => "Sharjah",
        Unknown => "Unknown",
    }
}

/// Every spelling observed in the wild, mapped to its canonical city.
pub const CITY_ALIASES: &[(&str, City)] = &[
    ("Dubai", City::Dubai),
    ("DXB", City::Dubai),
    ("DUBAI", City::Dubai),
    ("dubai", City::Dubai),
    ("Abu Dhabi", City::AbuDhabi),
    ("AUH", City::AbuDhabi),
    ("ABU DHABI", City::AbuDhabi),
    ("abudhabi", City::AbuDhabi),
    ("abu dhabi", City::AbuDhabi),
    ("AbuDhabi", City::AbuDhabi),
    ("Sharjah", City::Sharjah),
    ("SHJ", City::Sharjah),
    ("SHARJAH", City::Sharjah),
    ("sharjah", City::Sharjah),
];

impl City {
    pub const KNOWN: [City; 3] = [City::Dubai, City::AbuDhabi, City::Sharjah];

    /// Exact-match lookup against [`CITY_ALIASES`] after trimming.
    ///
    /// Returns `None` for spellings the table does not know.
    pub fn lookup(raw: &str) -> Option<City> {
        let raw = raw.trim();
        CITY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == raw)
            .map(|(_, city)| *city)
    }

    /// Standardize a spelling, degrading unmapped values to [`City::Unknown`].
    pub fn standardize(raw: &str) -> City {
        Self::lookup(raw).unwrap_or(City::Unknown)
    }

    /// Non-canonical spellings of this city.
    pub fn variants(&self) -> Vec<&'static str> {
        CITY_ALIASES
            .iter()
            .filter(|(alias, city)| city == self && *alias != self.as_str())
            .map(|(alias, _)| *alias)
            .collect()
    }
}

label_enum! {
    /// Payment outcome of an order.
    pub enum PaymentStatus {
        Paid => "Paid",
        Pending => "Pending",
        Failed => "Failed",
        Refunded => "Refunded",
        Unknown => "Unknown",
    }
}

impl PaymentStatus {
    /// Parse a status, reading the legacy `Completed` label as `Paid`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("completed") {
            return Some(PaymentStatus::Paid);
        }
        Self::from_label(raw)
    }
}

label_enum! {
    /// Whether a product is a recent launch.
    pub enum LaunchFlag {
        New => "New",
        Regular => "Regular",
    }
}

label_enum! {
    /// Health of an inventory snapshot relative to its reorder point.
    pub enum StockStatus {
        Critical => "Critical",
        Low => "Low",
        Healthy => "Healthy",
    }
}

impl StockStatus {
    /// `stock <= 0` is Critical, `stock <= reorder_point` is Low, anything else Healthy.
    pub fn classify(stock_on_hand: i64, reorder_point: i64) -> Self {
        if stock_on_hand <= 0 {
            StockStatus::Critical
        } else if stock_on_hand <= reorder_point {
            StockStatus::Low
        } else {
            StockStatus::Healthy
        }
    }
}

/// Either every value of a dimension or one specific value.
///
/// Used for campaign targeting and for segment filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope<T> {
    All,
    Only(T),
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Scope::All
    }
}

impl<T: PartialEq> Scope<T> {
    /// Whether a (possibly unresolved) value falls inside this scope.
    pub fn admits(&self, value: Option<&T>) -> bool {
        match self {
            Scope::All => true,
            Scope::Only(expected) => value == Some(expected),
        }
    }

    /// Whether two scopes share at least one value.
    pub fn overlaps(&self, other: &Scope<T>) -> bool {
        match (self, other) {
            (Scope::All, _) | (_, Scope::All) => true,
            (Scope::Only(a), Scope::Only(b)) => a == b,
        }
    }
}

impl<T> Scope<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }

    /// Parse `All` (or a blank cell) as [`Scope::All`], anything else with `parse`.
    pub fn parse_with(raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Some(Scope::All);
        }
        parse(raw).map(Scope::Only)
    }
}

impl<T: fmt::Display> fmt::Display for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("All"),
            Scope::Only(value) => value.fmt(f),
        }
    }
}

impl<T: fmt::Display> Serialize for Scope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
