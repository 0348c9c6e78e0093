//! Macros for ergonomic state declarations.

/// Generate a state enum and its `State` implementation.
///
/// Variant names are used as state names unless a string is given.
///
/// # Example
///
/// ```
/// use statekeeper::core::State;
/// use statekeeper::state_enum;
///
/// state_enum! {
///     pub enum OrderState {
///         Placed = "placed",
///         Shipped = "shipped",
///         Cancelled,
///     }
/// }
///
/// assert_eq!(OrderState::Placed.name(), "placed");
/// assert_eq!(OrderState::Cancelled.name(), "Cancelled");
/// ```
#[macro_export]
macro_rules! state_enum {
    (@name $variant:ident) => {
        stringify!($variant)
    };
    (@name $variant:ident $name:literal) => {
        $name
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $name:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $enum_name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@name $variant $($name)?)),*
                }
            }
        }
    };
}
