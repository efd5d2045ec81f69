//! Macro for reducing boilerplate when defining catalog and platform records
//!
//! Hand-written models (bookings, hotels, rooms, ...) implement the traits
//! directly. Simpler records are declared with [`impl_data_entity!`], which
//! generates the struct, the `Entity` and `Data` impls and a few helpers.

/// Declare a record with the base fields plus its own fields
///
/// Injects `id`, `type`, `created_at`, `updated_at`, `deleted_at`, `status`
/// and `name`. An optional `tenant: field` names the field holding the owning
/// hotel id.
///
/// # Example
///
/// ```rust,ignore
/// impl_data_entity!(
///     Guide,
///     "guide",
///     "guides",
///     ["phone"],
///     {
///         phone: String,
///         #[serde(default)]
///         languages: Vec<String>,
///     }
/// );
///
/// let guide = Guide::new(
///     "Sokha".to_string(),
///     "available".to_string(),
///     "+85512345678".to_string(),
///     vec!["en".to_string()],
/// );
/// ```
#[macro_export]
macro_rules! impl_data_entity {
    (
        $type:ident,
        $singular:expr,
        $plural:expr,
        $( tenant: $tenant:ident, )?
        [ $( $indexed_field:expr ),* $(,)? ],
        {
            $( $(#[$field_meta:meta])* $specific_field:ident : $specific_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            pub id: ::uuid::Uuid,

            #[serde(rename = "type")]
            pub entity_type: String,

            pub created_at: ::chrono::DateTime<::chrono::Utc>,

            pub updated_at: ::chrono::DateTime<::chrono::Utc>,

            pub deleted_at: Option<::chrono::DateTime<::chrono::Utc>>,

            pub status: String,

            pub name: String,
            $( $(#[$field_meta])* pub $specific_field : $specific_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn entity_type(&self) -> &str {
                &self.entity_type
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn deleted_at(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.deleted_at
            }

            fn status(&self) -> &str {
                &self.status
            }

            fn tenant_id(&self) -> Option<::uuid::Uuid> {
                None $( .or(Some(self.$tenant)) )?
            }
        }

        impl $crate::core::entity::Data for $type {
            fn name(&self) -> &str {
                &self.name
            }

            fn indexed_fields() -> &'static [&'static str] {
                &[ $( $indexed_field ),* ]
            }

            /// Base fields directly, anything else through its JSON form
            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                match field {
                    "id" => Some($crate::core::field::FieldValue::Uuid(self.id)),
                    "name" => Some($crate::core::field::FieldValue::String(self.name.clone())),
                    "status" => Some($crate::core::field::FieldValue::String(self.status.clone())),
                    "created_at" => Some($crate::core::field::FieldValue::DateTime(self.created_at)),
                    _ => {
                        let json = ::serde_json::to_value(self).ok()?;
                        $crate::core::field::FieldValue::from_json(json.get(field)?)
                    }
                }
            }
        }

        impl $type {
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                name: String,
                status: String,
                $( $specific_field: $specific_type ),*
            ) -> Self {
                let now = ::chrono::Utc::now();
                Self {
                    id: ::uuid::Uuid::new_v4(),
                    entity_type: $singular.to_string(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                    status,
                    name,
                    $( $specific_field ),*
                }
            }

            /// Soft delete this record (sets deleted_at timestamp)
            pub fn soft_delete(&mut self) {
                self.deleted_at = Some(::chrono::Utc::now());
                self.touch();
            }

            pub fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }

            pub fn set_status(&mut self, status: impl Into<String>) {
                self.status = status.into();
                self.touch();
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::entity::{Data, Entity};
    use crate::core::field::FieldValue;
    use uuid::Uuid;

    crate::impl_data_entity!(Shuttle, "shuttle", "shuttles", tenant: hotel_id, ["hotel_id"], {
        hotel_id: Uuid,
        seats: u32,
        #[serde(default)]
        stops: Vec<String>,
    });

    crate::impl_data_entity!(Leaflet, "leaflet", "leaflets", [], {
        language: String,
    });

    #[test]
    fn test_generated_entity() {
        let hotel_id = Uuid::new_v4();
        let shuttle = Shuttle::new(
            "Airport run".to_string(),
            "active".to_string(),
            hotel_id,
            12,
            vec!["PNH".to_string()],
        );

        assert_eq!(Shuttle::resource_name(), "shuttles");
        assert_eq!(shuttle.entity_type(), "shuttle");
        assert_eq!(shuttle.tenant_id(), Some(hotel_id));
        assert!(shuttle.is_active());
        assert_eq!(shuttle.field_value("seats"), Some(FieldValue::Integer(12)));
        assert_eq!(shuttle.field_value("stops"), None);
        assert_eq!(
            shuttle.field_value("hotel_id").and_then(|v| v.as_uuid()),
            Some(hotel_id)
        );
    }

    #[test]
    fn test_untenanted_entity_and_soft_delete() {
        let mut leaflet = Leaflet::new("Temples".to_string(), "active".to_string(), "km".to_string());
        assert_eq!(leaflet.tenant_id(), None);

        leaflet.soft_delete();
        assert!(leaflet.is_deleted());
        assert!(!leaflet.is_active());
    }

    #[test]
    fn test_type_renamed_in_json() {
        let leaflet = Leaflet::new("Temples".to_string(), "active".to_string(), "en".to_string());
        let json = serde_json::to_value(&leaflet).unwrap();
        assert_eq!(json["type"], "leaflet");
        assert!(json.get("entity_type").is_none());
    }
}
