/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` declares a configuration section together with its
/// defaults. It generates:
/// - the struct with public fields
/// - a `Default` impl using the embedded values
/// - serde support with `#[serde(default)]`, so a partial TOML table keeps
///   defaults for every field it omits
///
/// # Example
/// ```
/// hostpulse::config_struct! {
///     pub struct SamplerConfig {
///         interval_ms: u64 = 5000,
///         include_disks: bool = true,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
