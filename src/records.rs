use crate::errors::AppError;
use crate::images::check_image_ref;
use crate::models::{
    CompanyInfo, GalleryItem, JournalEntry, MonthlyReport, PortfolioProject, StudentProfile,
};
use crate::storage::{keys, LocalStore};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

/// A member of a whole-blob collection such as the journal.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KEY: &'static str;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn validate(&self) -> Result<(), AppError>;
}

/// A single stored form such as the student profile.
pub trait Document: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const KEY: &'static str;

    fn validate(&self) -> Result<(), AppError>;
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::missing_field(field));
    }
    Ok(())
}

macro_rules! record {
    ($ty:ty, $key:expr, [$($field:ident),+] $(, images [$($image:ident),+])?) => {
        impl Record for $ty {
            const KEY: &'static str = $key;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }

            fn validate(&self) -> Result<(), AppError> {
                $(require(stringify!($field), &self.$field)?;)+
                $($(check_image_ref(stringify!($image), &self.$image)?;)+)?
                Ok(())
            }
        }
    };
}

record!(JournalEntry, keys::JOURNAL_ENTRIES, [date, activity]);
record!(MonthlyReport, keys::MONTHLY_REPORTS, [month, title, content]);
record!(PortfolioProject, keys::PORTFOLIO_PROJECTS, [title, description], images [image]);
record!(GalleryItem, keys::GALLERY_ITEMS, [title, image]);

impl Document for StudentProfile {
    const KEY: &'static str = keys::STUDENT_PROFILE;

    fn validate(&self) -> Result<(), AppError> {
        require("name", &self.name)?;
        check_image_ref("photo", &self.photo)
    }
}

impl Document for CompanyInfo {
    const KEY: &'static str = keys::COMPANY_INFO;

    fn validate(&self) -> Result<(), AppError> {
        require("name", &self.name)
    }
}

pub fn list<T: Record>(store: &LocalStore) -> Vec<T> {
    store.load_json(T::KEY)
}

/// Appends `record` under a timestamp id that is unique in its collection.
pub async fn add<T: Record>(store: &mut LocalStore, mut record: T, now: i64) -> Result<T, AppError> {
    record.validate()?;
    let mut items: Vec<T> = list(store);
    record.set_id(unique_id(&items, now));
    items.push(record.clone());
    store.save_json(T::KEY, &items).await?;
    info!(key = T::KEY, id = record.id(), "record added");
    Ok(record)
}

/// Replaces the record in place, keeping its position and id.
pub async fn update<T: Record>(store: &mut LocalStore, id: i64, mut record: T) -> Result<T, AppError> {
    record.validate()?;
    let mut items: Vec<T> = list(store);
    let slot = items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or_else(|| AppError::not_found(format!("{} has no item {id}", T::KEY)))?;
    record.set_id(id);
    *slot = record.clone();
    store.save_json(T::KEY, &items).await?;
    info!(key = T::KEY, id, "record updated");
    Ok(record)
}

/// Removes only `id`; the rest keep their order. Nothing happens unless
/// the caller confirmed.
pub async fn delete<T: Record>(store: &mut LocalStore, id: i64, confirmed: bool) -> Result<(), AppError> {
    if !confirmed {
        return Err(AppError::conflict("deletion must be confirmed"));
    }
    let mut items: Vec<T> = list(store);
    let before = items.len();
    items.retain(|item| item.id() != id);
    if items.len() == before {
        return Err(AppError::not_found(format!("{} has no item {id}", T::KEY)));
    }
    store.save_json(T::KEY, &items).await?;
    info!(key = T::KEY, id, "record deleted");
    Ok(())
}

pub fn load_document<T: Document>(store: &LocalStore) -> T {
    store.load_json(T::KEY)
}

pub async fn save_document<T: Document>(store: &mut LocalStore, document: T) -> Result<T, AppError> {
    document.validate()?;
    store.save_json(T::KEY, &document).await?;
    info!(key = T::KEY, "document saved");
    Ok(document)
}

fn unique_id<T: Record>(items: &[T], now: i64) -> i64 {
    let mut id = now;
    while items.iter().any(|item| item.id() == id) {
        id += 1;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scratch_path;

    fn entry(date: &str, activity: &str) -> JournalEntry {
        JournalEntry {
            date: date.to_string(),
            activity: activity.to_string(),
            ..JournalEntry::default()
        }
    }

    fn assert_send<F: std::future::Future + Send>(_: &F) {}

    // Generic so the bound comes from `Record` alone, as in the routers.
    async fn write_round<T: Record>(store: &mut LocalStore, record: T) {
        let added = add(store, record.clone(), 7);
        assert_send(&added);
        added.await.unwrap();
        let updated = update(store, 7, record);
        assert_send(&updated);
        updated.await.unwrap();
        let deleted = delete::<T>(store, 7, true);
        assert_send(&deleted);
        deleted.await.unwrap();
    }

    #[tokio::test]
    async fn collection_writes_can_run_on_any_worker() {
        let path = scratch_path("records_send");
        let mut store = LocalStore::open(path.clone()).await;

        write_round(&mut store, entry("2025-01-06", "Orientation")).await;

        assert!(list::<JournalEntry>(&store).is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn add_persists_whole_collection() {
        let path = scratch_path("records_add");
        let mut store = LocalStore::open(path.clone()).await;
        add(&mut store, entry("2025-01-06", "Orientation"), 100).await.unwrap();
        add(&mut store, entry("2025-01-07", "Network audit"), 100).await.unwrap();

        let reopened = LocalStore::open(path.clone()).await;
        let items: Vec<JournalEntry> = list(&reopened);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 100);
        assert_eq!(items[1].id, 101);
        assert_eq!(items, list::<JournalEntry>(&store));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn delete_keeps_remaining_order() {
        let path = scratch_path("records_delete");
        let mut store = LocalStore::open(path.clone()).await;
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            add(&mut store, entry("2025-02-01", name), i as i64 * 10).await.unwrap();
        }

        delete::<JournalEntry>(&mut store, 10, true).await.unwrap();

        let names: Vec<String> = list::<JournalEntry>(&store)
            .into_iter()
            .map(|item| item.activity)
            .collect();
        assert_eq!(names, ["a", "c", "d"]);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn unconfirmed_delete_changes_nothing() {
        let path = scratch_path("records_confirm");
        let mut store = LocalStore::open(path.clone()).await;
        add(&mut store, entry("2025-02-01", "a"), 1).await.unwrap();

        let err = delete::<JournalEntry>(&mut store, 1, false).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::CONFLICT);
        assert_eq!(list::<JournalEntry>(&store).len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_required_field_is_rejected() {
        let path = scratch_path("records_required");
        let mut store = LocalStore::open(path.clone()).await;

        let err = add(&mut store, entry("2025-02-01", "  "), 1).await.unwrap_err();
        assert_eq!(err.message, "activity is required");
        assert!(store.get_item(keys::JOURNAL_ENTRIES).is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn image_fields_reject_markup() {
        let path = scratch_path("records_images");
        let mut store = LocalStore::open(path.clone()).await;

        let profile = StudentProfile {
            name: "Sari".to_string(),
            photo: "x\" onerror=\"alert(1)".to_string(),
            ..StudentProfile::default()
        };
        let err = save_document(&mut store, profile).await.unwrap_err();
        assert_eq!(err.message, "photo must be a data:image URL or an http(s) link");

        let project = PortfolioProject {
            title: "Inventory app".to_string(),
            description: "Stock tracking".to_string(),
            image: "javascript:alert(1)".to_string(),
            ..PortfolioProject::default()
        };
        assert!(add(&mut store, project, 1).await.is_err());
        assert!(store.get_item(keys::PORTFOLIO_PROJECTS).is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn update_keeps_position_and_id() {
        let path = scratch_path("records_update");
        let mut store = LocalStore::open(path.clone()).await;
        add(&mut store, entry("2025-03-01", "first"), 1).await.unwrap();
        add(&mut store, entry("2025-03-02", "second"), 2).await.unwrap();

        let mut edited = entry("2025-03-01", "first, revised");
        edited.id = 999;
        update(&mut store, 1, edited).await.unwrap();

        let items: Vec<JournalEntry> = list(&store);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].activity, "first, revised");
        assert_eq!(items[1].activity, "second");
        let _ = std::fs::remove_file(path);
    }
}
