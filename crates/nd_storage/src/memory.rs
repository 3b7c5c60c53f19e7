use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use nd_core::{Article, ArticleId, FilterResult};
use tokio::sync::RwLock;

/// Shared, individually locked article.
pub type ArticleHandle = Arc<RwLock<Article>>;

#[derive(Default)]
struct StoreInner {
    order: Vec<ArticleHandle>,
    index: HashMap<ArticleId, ArticleHandle>,
}

/// Ordered, in-memory article collection owned by one session.
///
/// The list itself sits behind one lock that is only written on insert;
/// every article has its own lock, so filter writes to different articles
/// never contend and two writers to the same article serialize.
#[derive(Default)]
pub struct ArticleStore {
    inner: RwLock<StoreInner>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let store = Self::new();
        store.extend(articles).await;
        store
    }

    /// Add an article at the end. An article whose id is already stored is
    /// ignored and `false` is returned.
    pub async fn insert(&self, article: Article) -> bool {
        let mut inner = self.inner.write().await;
        if inner.index.contains_key(&article.id) {
            tracing::debug!("Skipping duplicate article {} ({})", article.id, article.title);
            return false;
        }
        let id = article.id.clone();
        let handle = Arc::new(RwLock::new(article));
        inner.order.push(handle.clone());
        inner.index.insert(id, handle);
        true
    }

    /// Insert many articles, returning how many were new.
    pub async fn extend(&self, articles: impl IntoIterator<Item = Article>) -> usize {
        let mut added = 0;
        for article in articles {
            if self.insert(article).await {
                added += 1;
            }
        }
        added
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn handle(&self, id: &ArticleId) -> Option<ArticleHandle> {
        self.inner.read().await.index.get(id).cloned()
    }

    /// Handles in store order.
    pub async fn handles(&self) -> Vec<ArticleHandle> {
        self.inner.read().await.order.clone()
    }

    pub async fn ids(&self) -> Vec<ArticleId> {
        let mut ids = Vec::new();
        for handle in self.handles().await {
            ids.push(handle.read().await.id.clone());
        }
        ids
    }

    pub async fn get(&self, id: &ArticleId) -> Option<Article> {
        let handle = self.handle(id).await?;
        let article = handle.read().await.clone();
        Some(article)
    }

    /// Copy of every article in store order.
    pub async fn snapshot(&self) -> Vec<Article> {
        let mut articles = Vec::new();
        for handle in self.handles().await {
            articles.push(handle.read().await.clone());
        }
        articles
    }

    /// Apply `f` under the article's write lock. Returns `false` when the id
    /// is unknown.
    pub async fn update<F>(&self, id: &ArticleId, f: F) -> bool
    where
        F: FnOnce(&mut Article),
    {
        match self.handle(id).await {
            Some(handle) => {
                f(&mut *handle.write().await);
                true
            }
            None => false,
        }
    }

    /// Store `result` under `name`, replacing any previous result.
    pub async fn set_filter(&self, id: &ArticleId, name: &str, result: FilterResult) -> bool {
        self.update(id, |article| {
            article.set_filter(name, result);
        })
        .await
    }

    pub async fn get_filter(&self, id: &ArticleId, name: &str) -> Option<FilterResult> {
        let handle = self.handle(id).await?;
        let article = handle.read().await;
        article.filter(name).cloned()
    }

    pub async fn compose_and<S: AsRef<str>>(&self, names: &[S]) -> Vec<Article> {
        let mut matching = Vec::new();
        for handle in self.handles().await {
            let article = handle.read().await;
            if article.passes_all(names) {
                matching.push(article.clone());
            }
        }
        matching
    }

    pub async fn articles_matching(&self, name: &str) -> Vec<Article> {
        self.compose_and(&[name]).await
    }

    pub async fn list_filter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for handle in self.handles().await {
            names.extend(handle.read().await.filters.keys().cloned());
        }
        names
    }

    pub async fn set_selected(&self, id: &ArticleId, selected: bool) -> bool {
        self.update(id, |article| article.user_selected = selected).await
    }

    pub async fn select_all(&self, ids: &[ArticleId]) -> usize {
        self.set_selected_many(ids, true).await
    }

    pub async fn deselect_all(&self, ids: &[ArticleId]) -> usize {
        self.set_selected_many(ids, false).await
    }

    async fn set_selected_many(&self, ids: &[ArticleId], selected: bool) -> usize {
        let mut changed = 0;
        for id in ids {
            if self.set_selected(id, selected).await {
                changed += 1;
            }
        }
        changed
    }

    /// Selected articles in store order.
    pub async fn selected(&self) -> Vec<Article> {
        let mut selected = Vec::new();
        for handle in self.handles().await {
            let article = handle.read().await;
            if article.user_selected {
                selected.push(article.clone());
            }
        }
        selected
    }

    pub async fn set_embedding(&self, id: &ArticleId, embedding: Vec<f32>) -> bool {
        self.update(id, |article| article.embedding = Some(embedding)).await
    }

    pub async fn set_projection(&self, id: &ArticleId, point: (f32, f32)) -> bool {
        self.update(id, |article| article.projection_2d = Some(point)).await
    }

    pub async fn set_full_text(&self, id: &ArticleId, text: String) -> bool {
        self.update(id, |article| article.full_text = Some(text)).await
    }

    /// First article whose title matches exactly.
    pub async fn find_by_title(&self, title: &str) -> Option<Article> {
        for handle in self.handles().await {
            let article = handle.read().await;
            if article.title == title {
                return Some(article.clone());
            }
        }
        None
    }
}
