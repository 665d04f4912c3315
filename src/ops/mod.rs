//! Resource mutation operations
//!
//! Single-shot create, copy, delete, upload and download calls. Names are
//! resolved through the [`PathResolver`]; the calls themselves are never
//! retried and surface failures as fatal.

mod download;

pub use download::{Downloaded, ExportFormat, GetOptions};

use crate::error::{Error, Result};
use crate::query::{Predicate, Query};
use crate::remote::{Content, NewResource, RemoteResource, RemoteService, ResourcePatch};
use crate::resolve::PathResolver;
use crate::types::LookupKind;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mutation operations against one store
#[derive(Clone)]
pub struct DriveOperations {
    service: Arc<dyn RemoteService>,
    resolver: PathResolver,
}

impl DriveOperations {
    pub fn new(service: Arc<dyn RemoteService>, resolver: PathResolver) -> Self {
        Self { service, resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Create a folder under `parent_id` and return its id.
    ///
    /// Does not check whether a folder with that name already exists.
    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        let created = self
            .service
            .create(NewResource::folder(name, parent_id), None)
            .await
            .map_err(Error::into_fatal)?;
        debug!("Created folder '{}' ({}) in {}", name, created.id, parent_id);
        Ok(created.id)
    }

    /// Copy a file into `dest_folder_id`, returning the copy's id.
    ///
    /// With `delete_original` the source is deleted afterwards, which makes
    /// this a move. The two steps are not atomic.
    pub async fn copy_file(
        &self,
        file_id: &str,
        dest_folder_id: &str,
        new_name: Option<&str>,
        delete_original: bool,
    ) -> Result<String> {
        debug!(
            "Copying {} to {} (new name: {:?}, delete original: {})",
            file_id, dest_folder_id, new_name, delete_original
        );
        let name = new_name.filter(|n| !n.is_empty()).map(str::to_string);
        let copied = self
            .service
            .copy(file_id, NewResource::copy_into(dest_folder_id, name))
            .await
            .map_err(Error::into_fatal)?;

        if delete_original {
            self.service
                .delete(file_id)
                .await
                .map_err(Error::into_fatal)?;
        }
        Ok(copied.id)
    }

    /// Copy a folder tree into `dest_id` under `new_name`.
    ///
    /// Trashed children are skipped. A folder reached twice, or one this
    /// copy created itself, is not copied again.
    pub async fn copy_folder(&self, source_id: &str, dest_id: &str, new_name: &str) -> Result<String> {
        debug!("Copying folder {} into {} as '{}'", source_id, dest_id, new_name);

        let root_copy = self.create_folder(dest_id, new_name).await?;
        let mut visited: HashSet<String> = HashSet::from([source_id.to_string()]);
        let mut created: HashSet<String> = HashSet::from([root_copy.clone()]);
        let mut stack = vec![(source_id.to_string(), root_copy.clone())];

        while let Some((source, target)) = stack.pop() {
            let children = self.list_children(&source, false).await?;
            let mut subfolders = Vec::new();

            for child in children {
                if !child.is_folder() {
                    self.copy_file(&child.id, &target, Some(child.name.as_str()), false)
                        .await?;
                    continue;
                }
                if created.contains(&child.id) || !visited.insert(child.id.clone()) {
                    warn!("Skipping folder {} ('{}'): already copied", child.id, child.name);
                    continue;
                }
                let copy = self.create_folder(&target, &child.name).await?;
                created.insert(copy.clone());
                subfolders.push((child.id, copy));
            }

            stack.extend(subfolders.into_iter().rev());
        }

        Ok(root_copy)
    }

    /// Trash or permanently delete a resource, returning its id
    pub async fn delete(&self, id: &str, use_trash: bool) -> Result<String> {
        if use_trash {
            info!("Moving {} to trash", id);
            self.service
                .update(id, ResourcePatch::trash())
                .await
                .map_err(Error::into_fatal)?;
        } else {
            info!("Deleting {}", id);
            self.service.delete(id).await.map_err(Error::into_fatal)?;
        }
        Ok(id.to_string())
    }

    /// Resolve a file or folder by name or path, then delete it
    pub async fn delete_by_name(
        &self,
        name: &str,
        use_trash: bool,
        include_shared_items: bool,
    ) -> Result<String> {
        let id = self
            .resolver
            .file_or_folder_id(name, false, include_shared_items)
            .await?;
        self.delete(&id, use_trash).await
    }

    /// Upload a file named `name` into `parent_id`.
    ///
    /// A non-trashed file with the same name in the folder is replaced when
    /// `overwrite` is set and reported as `AlreadyExists` otherwise. Several
    /// such files are always an error.
    pub async fn put(
        &self,
        parent_id: &str,
        name: &str,
        content: Content,
        overwrite: bool,
    ) -> Result<RemoteResource> {
        let query = Query::new()
            .and(Predicate::NotTrashed)
            .and(Predicate::Name(name.to_string()))
            .and(Predicate::NotFolder)
            .and(Predicate::InParents(parent_id.to_string()))
            .build();
        let existing = self.list_all(&query).await?;
        debug!("'{}' in {}: {} existing file(s)", name, parent_id, existing.len());

        match existing.as_slice() {
            [] => {}
            [current] if overwrite => {
                debug!("Overwriting {} ('{}')", current.id, name);
                self.service
                    .delete(&current.id)
                    .await
                    .map_err(Error::into_fatal)?;
            }
            [_] => return Err(Error::already_exists(LookupKind::File, name)),
            many => return Err(Error::ambiguous(LookupKind::File, name, many.len())),
        }

        self.service
            .create(NewResource::file(name, parent_id), Some(content))
            .await
            .map_err(Error::into_fatal)
    }

    /// Direct children of a folder, across all pages
    pub async fn list_children(
        &self,
        parent_id: &str,
        include_trashed: bool,
    ) -> Result<Vec<RemoteResource>> {
        let query = Query::new()
            .and(Predicate::InParents(parent_id.to_string()))
            .and_if(!include_trashed, Predicate::NotTrashed)
            .build();
        self.list_all(&query).await
    }

    async fn list_all(&self, query: &str) -> Result<Vec<RemoteResource>> {
        let options = self.resolver.options();
        let mut request = options.scope.list_request(query, options.page_size);
        let mut items = Vec::new();

        loop {
            let page = self
                .service
                .list(&request)
                .await
                .map_err(Error::into_fatal)?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) => request.page_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

impl std::fmt::Debug for DriveOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveOperations")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
