//! Tag reconciler - makes sure categories and tags exist and attaches them
//! to a template.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use vtmpl_govc::{GovcError, ObjectType};

use crate::client::TagClient;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("failed listing vsphere categories: {0}")]
    ListCategories(GovcError),

    #[error("failed listing vsphere tags: {0}")]
    ListTags(GovcError),

    #[error("failed creating category {category}: {source}")]
    CreateCategory {
        category: String,
        source: GovcError,
    },

    #[error("failed creating tag {tag} in category {category}: {source}")]
    CreateTag {
        tag: String,
        category: String,
        source: GovcError,
    },

    #[error("failed tagging {path} with {tag}: {source}")]
    AttachTag {
        tag: String,
        path: String,
        source: GovcError,
    },
}

pub type Result<T> = std::result::Result<T, TagError>;

/// Creates missing categories and tags and attaches tags to templates.
pub struct TagFactory<C> {
    client: Arc<C>,
}

impl<C: TagClient> TagFactory<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Tag `path` with every tag in `tags_by_category`.
    ///
    /// Categories are created for virtual machines only. Every requested tag
    /// is attached, including tags that already existed.
    pub async fn tag_template(
        &self,
        path: &str,
        tags_by_category: &BTreeMap<String, Vec<String>>,
    ) -> Result<()> {
        info!(template = %path, "Tagging template");

        let categories = self
            .client
            .list_categories()
            .await
            .map_err(TagError::ListCategories)?;
        let tags = self.client.list_tags().await.map_err(TagError::ListTags)?;

        let categories: HashSet<String> = categories.into_iter().collect();
        let mut known_tags: HashSet<String> = tags.into_iter().map(|t| t.name).collect();

        for (category, tags) in tags_by_category {
            if !categories.contains(category) {
                debug!(category = %category, "Creating category");
                self.client
                    .create_category(category, &[ObjectType::VirtualMachine])
                    .await
                    .map_err(|source| TagError::CreateCategory {
                        category: category.clone(),
                        source,
                    })?;
            }

            for tag in tags {
                if !known_tags.contains(tag) {
                    debug!(tag = %tag, category = %category, "Creating tag");
                    self.client.create_tag(tag, category).await.map_err(|source| {
                        TagError::CreateTag {
                            tag: tag.clone(),
                            category: category.clone(),
                            source,
                        }
                    })?;
                    known_tags.insert(tag.clone());
                }

                debug!(tag = %tag, template = %path, "Adding tag to template");
                self.client
                    .attach_tag(path, tag)
                    .await
                    .map_err(|source| TagError::AttachTag {
                        tag: tag.clone(),
                        path: path.to_string(),
                        source,
                    })?;
            }
        }

        Ok(())
    }

    /// Tags currently attached to `path`.
    pub async fn attached_tags(&self, path: &str) -> std::result::Result<Vec<String>, GovcError> {
        self.client.attached_tags(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vtmpl_govc::Tag;

    #[derive(Default)]
    struct FakeTags {
        categories: Vec<String>,
        tags: Vec<Tag>,
        fail_attach: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTags {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn command_error() -> GovcError {
        GovcError::Command {
            command: "tags.attach".to_string(),
            stderr: "401 Unauthorized".to_string(),
        }
    }

    #[async_trait]
    impl TagClient for FakeTags {
        async fn list_categories(&self) -> vtmpl_govc::Result<Vec<String>> {
            self.record("list_categories".to_string());
            Ok(self.categories.clone())
        }

        async fn create_category(
            &self,
            name: &str,
            object_types: &[ObjectType],
        ) -> vtmpl_govc::Result<()> {
            assert_eq!(object_types, &[ObjectType::VirtualMachine]);
            self.record(format!("create_category {}", name));
            Ok(())
        }

        async fn list_tags(&self) -> vtmpl_govc::Result<Vec<Tag>> {
            self.record("list_tags".to_string());
            Ok(self.tags.clone())
        }

        async fn create_tag(&self, tag: &str, category: &str) -> vtmpl_govc::Result<()> {
            self.record(format!("create_tag {} {}", tag, category));
            Ok(())
        }

        async fn attach_tag(&self, path: &str, tag: &str) -> vtmpl_govc::Result<()> {
            self.record(format!("attach_tag {} {}", path, tag));
            if self.fail_attach {
                return Err(command_error());
            }
            Ok(())
        }

        async fn attached_tags(&self, _path: &str) -> vtmpl_govc::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn tag(name: &str, category_id: &str) -> Tag {
        Tag {
            id: format!("urn:tag:{}", name),
            name: name.to_string(),
            category_id: category_id.to_string(),
        }
    }

    const PATH: &str = "/DC/vm/Templates/ubuntu";

    #[tokio::test]
    async fn test_existing_category_and_tag_are_only_attached() {
        let client = Arc::new(FakeTags {
            categories: vec!["eksd".to_string()],
            tags: vec![tag("eksd:1.19-4", "urn:cat:eksd")],
            ..Default::default()
        });
        let factory = TagFactory::new(Arc::clone(&client));

        let wanted = BTreeMap::from([("eksd".to_string(), vec!["eksd:1.19-4".to_string()])]);
        factory.tag_template(PATH, &wanted).await.unwrap();

        assert_eq!(
            client.calls(),
            vec![
                "list_categories".to_string(),
                "list_tags".to_string(),
                format!("attach_tag {} eksd:1.19-4", PATH),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_category_and_tags_are_created() {
        let client = Arc::new(FakeTags {
            categories: vec!["eksd".to_string()],
            tags: vec![tag("eksd:1.19-4", "urn:cat:eksd")],
            ..Default::default()
        });
        let factory = TagFactory::new(Arc::clone(&client));

        let wanted = BTreeMap::from([
            ("eksd".to_string(), vec!["eksd:1.19-4".to_string()]),
            ("os".to_string(), vec!["os:ubuntu".to_string()]),
        ]);
        factory.tag_template(PATH, &wanted).await.unwrap();

        assert_eq!(
            client.calls(),
            vec![
                "list_categories".to_string(),
                "list_tags".to_string(),
                format!("attach_tag {} eksd:1.19-4", PATH),
                "create_category os".to_string(),
                "create_tag os:ubuntu os".to_string(),
                format!("attach_tag {} os:ubuntu", PATH),
            ]
        );
    }

    #[tokio::test]
    async fn test_lists_even_without_tags() {
        let client = Arc::new(FakeTags::default());
        let factory = TagFactory::new(Arc::clone(&client));

        factory.tag_template(PATH, &BTreeMap::new()).await.unwrap();
        assert_eq!(client.calls(), vec!["list_categories", "list_tags"]);
    }

    #[tokio::test]
    async fn test_attach_failure_stops_the_loop() {
        let client = Arc::new(FakeTags {
            fail_attach: true,
            ..Default::default()
        });
        let factory = TagFactory::new(Arc::clone(&client));

        let wanted = BTreeMap::from([(
            "os".to_string(),
            vec!["os:ubuntu".to_string(), "os:other".to_string()],
        )]);
        let err = factory.tag_template(PATH, &wanted).await.unwrap_err();

        assert!(matches!(err, TagError::AttachTag { ref tag, .. } if tag == "os:ubuntu"));
        assert!(!client.calls().iter().any(|c| c.contains("os:other")));
    }
}
