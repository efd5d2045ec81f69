//! Macro-generated test suite for `DataService<Tour>` contract validation
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use derlg::storage::InMemoryDataService;
//!
//! data_service_tests!(InMemoryDataService::<Tour>::new());
//! ```
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_create_and_get`, `test_get_nonexistent`
//! - `test_list_empty`, `test_list_multiple`
//! - `test_update_existing`, `test_update_nonexistent`
//! - `test_delete_existing`, `test_soft_delete_round_trip`
//!
//! ## Search
//! - one test per searchable field type, plus status, no match and unknown field
//!
//! ## Concurrency
//! - `test_concurrent_access`: parallel creates from spawned tasks

/// Generate a full `DataService<Tour>` conformance test suite.
///
/// `$factory` is re-evaluated for each test. Backends sharing one database
/// must return a service over an empty table. For the concurrent access test
/// the service must also be `Clone + 'static`.
#[macro_export]
macro_rules! data_service_tests {
    ($factory:expr) => {
        mod data_service_contract_tests {
            use super::*;
            use derlg::core::entity::{Data, Entity};
            use derlg::core::service::DataService;
            use derlg::entities::catalog::Tour;
            use uuid::Uuid;

            #[tokio::test]
            async fn test_create_and_get() {
                let service = $factory;
                let tour = create_test_tour("Angkor Sunrise", "Siem Reap", 120, 4.5, true);
                let id = tour.id;

                let created = service.create(tour).await.unwrap();
                assert_eq!(created.id(), id);
                assert_eq!(created.name(), "Angkor Sunrise");
                assert_eq!(created.entity_type(), "tour");
                assert_eq!(created.status(), "active");

                let fetched = service.get(&id).await.unwrap().expect("tour should exist");
                assert_eq!(fetched.destination, "Siem Reap");
                assert_eq!(fetched.total_bookings, 120);
                assert!((fetched.average_rating - 4.5).abs() < f64::EPSILON);
                assert!(fetched.guide_required);
                assert!(fetched.deleted_at.is_none());
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let service = $factory;
                assert!(service.get(&Uuid::new_v4()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_list_empty() {
                let service = $factory;
                assert!(service.list().await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_list_multiple() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                assert_eq!(service.list().await.unwrap().len(), 5);
            }

            #[tokio::test]
            async fn test_update_existing() {
                let service = $factory;
                let mut tour = service
                    .create(create_test_tour("Pepper Farm", "Kampot", 40, 3.5, false))
                    .await
                    .unwrap();

                tour.name = "Pepper and Salt Farms".to_string();
                tour.total_bookings = 41;
                tour.set_status("inactive");
                let updated = service.update(&tour.id, tour.clone()).await.unwrap();
                assert_eq!(updated.name(), "Pepper and Salt Farms");

                let fetched = service.get(&tour.id).await.unwrap().unwrap();
                assert_eq!(fetched.total_bookings, 41);
                assert_eq!(fetched.status(), "inactive");
            }

            #[tokio::test]
            async fn test_update_nonexistent() {
                let service = $factory;
                let tour = create_test_tour("Ghost", "Nowhere", 0, 3.5, false);
                assert!(service.update(&tour.id, tour.clone()).await.is_err());
            }

            #[tokio::test]
            async fn test_delete_existing() {
                let service = $factory;
                let tour = service
                    .create(create_test_tour("Crab Market", "Kep", 15, 4.25, false))
                    .await
                    .unwrap();

                service.delete(&tour.id).await.unwrap();
                assert!(service.get(&tour.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_soft_delete_round_trip() {
                let service = $factory;
                let mut tour = service
                    .create(create_test_tour("Bamboo Train", "Battambang", 60, 3.75, true))
                    .await
                    .unwrap();

                tour.soft_delete();
                service.update(&tour.id, tour.clone()).await.unwrap();

                let fetched = service.get(&tour.id).await.unwrap().unwrap();
                assert!(fetched.is_deleted());
                assert!(!fetched.is_active());
            }

            #[tokio::test]
            async fn test_search_string_field() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                let found = service.search("destination", "Kampot").await.unwrap();
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].name(), "Pepper Farm");
            }

            #[tokio::test]
            async fn test_search_integer_field() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                let found = service.search("total_bookings", "200").await.unwrap();
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].destination, "Phnom Penh");
            }

            #[tokio::test]
            async fn test_search_float_field() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                let found = service.search("average_rating", "4.25").await.unwrap();
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].destination, "Kep");
            }

            #[tokio::test]
            async fn test_search_boolean_field() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                let found = service.search("guide_required", "true").await.unwrap();
                assert_eq!(found.len(), 3);
                assert!(found.iter().all(|t| t.guide_required));
            }

            #[tokio::test]
            async fn test_search_status_column() {
                let service = $factory;
                let mut tours = create_test_tours();
                tours[0].set_status("inactive");
                for tour in tours {
                    service.create(tour).await.unwrap();
                }
                assert_eq!(service.search("status", "active").await.unwrap().len(), 4);
                assert_eq!(service.search("status", "inactive").await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_search_no_results() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                assert!(service.search("destination", "Mondulkiri").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_search_unknown_field() {
                let service = $factory;
                for tour in create_test_tours() {
                    service.create(tour).await.unwrap();
                }
                assert!(service.search("no_such_field", "x").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_concurrent_access() {
                let service = $factory;
                let mut handles = Vec::new();
                for i in 0..10u32 {
                    let service = service.clone();
                    handles.push(tokio::spawn(async move {
                        let tour = create_test_tour(&format!("Tour {}", i), "Kratie", i, 4.5, false);
                        service.create(tour).await.unwrap()
                    }));
                }
                for handle in handles {
                    handle.await.unwrap();
                }

                let all: Vec<Tour> = service.list().await.unwrap();
                assert_eq!(all.len(), 10);
            }
        }
    };
}
