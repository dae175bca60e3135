use std::any::type_name;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;

/// Reads and parses a required variable, panicking with its name when it is missing or invalid.
fn required<T>(name: &str) -> T
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));

    raw.parse().unwrap_or_else(|e| {
        panic!("{name}='{raw}' is not a valid {}: {e}", type_name::<T>())
    })
}

/// Each static is named after the variable it is read from.
macro_rules! ruler_env {
    ($($name:ident: $type:ty),* $(,)?) => {
        $(
            pub static $name: LazyLock<$type> = LazyLock::new(|| required(stringify!($name)));
        )*

        /// Reads every variable now, so a bad deployment fails at startup instead of mid-shutdown.
        pub fn check_env() {
            $(
                LazyLock::force(&$name);
            )*
        }
    };
}

ruler_env! {
    INSTANCE_ID: String,
    CONSUL_URL: Url,
    RING_KEY: String,
    CONSUL_REQUEST_TIMEOUT_SECONDS: u64,
    SEARCH_PENDING_FOR_SECONDS: u64,
    FLUSH_CHECK_PERIOD_SECONDS: u64,
    CLAIM_ON_ROLLOUT: bool,
}
