//! Arena pool - per-lifetime page lists grown on demand.
//!
//! Pages are never released individually. A lifetime is reclaimed by
//! zeroing every one of its pages and keeping them for reuse.

use crate::allocators::page::Page;
use crate::api::error::LifetimeError;
use crate::api::lifetime::Lifetime;

/// The ordered pages belonging to one lifetime.
#[derive(Default)]
pub(crate) struct PageList {
    pages: Vec<Page>,
    /// Number of resets so far
    epoch: u64,
}

impl PageList {
    /// Find the first page with strictly more than `min_bytes` free,
    /// creating one of `max(min_bytes, page_size)` bytes if none qualifies.
    ///
    /// The returned page always has room for `min_bytes` more bytes.
    // TODO: remember the last page that satisfied a request if this walk shows up in profiles.
    pub fn find_or_create(&mut self, min_bytes: usize, page_size: usize) -> Result<&mut Page, LifetimeError> {
        let found = self.pages.iter().position(|page| page.available() > min_bytes);

        let index = match found {
            Some(index) => index,
            None => {
                let page = Page::new(min_bytes.max(page_size))?;
                #[cfg(feature = "log")]
                log::debug!(
                    "lifealloc: new {} byte page (page #{} for this lifetime)",
                    page.capacity(),
                    self.pages.len()
                );
                self.pages.push(page);
                self.pages.len() - 1
            }
        };

        Ok(&mut self.pages[index])
    }

    /// Zero every page and mark it empty. Returns the bytes released.
    pub fn reset(&mut self) -> usize {
        let mut released = 0;
        for page in &mut self.pages {
            released += page.used();
            page.reset();
        }
        self.epoch += 1;
        released
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn used_bytes(&self) -> usize {
        self.pages.iter().map(Page::used).sum()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.pages.iter().map(Page::capacity).sum()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
}

/// Backing storage for every lifetime, indexed by [`Lifetime::index`].
pub(crate) struct ArenaPool {
    lists: Vec<PageList>,
    page_size: usize,
}

impl ArenaPool {
    /// Create an empty pool for `lifetime_count` lifetimes.
    ///
    /// No pages are allocated until the first request.
    pub fn new(lifetime_count: usize, page_size: usize) -> Self {
        let mut lists = Vec::with_capacity(lifetime_count);
        lists.resize_with(lifetime_count, PageList::default);
        Self { lists, page_size }
    }

    /// Number of lifetimes this pool serves.
    pub fn lifetime_count(&self) -> usize {
        self.lists.len()
    }

    /// Whether `lifetime` is within this pool's range.
    pub fn contains(&self, lifetime: Lifetime) -> bool {
        lifetime.index() < self.lists.len()
    }

    /// Get a page of `lifetime` with room for `min_bytes` more bytes.
    pub fn find_or_create_page(&mut self, lifetime: Lifetime, min_bytes: usize) -> Result<&mut Page, LifetimeError> {
        let page_size = self.page_size;
        self.list_mut(lifetime)?.find_or_create(min_bytes, page_size)
    }

    /// Zero and empty every page of `lifetime`. Returns the bytes released.
    pub fn reset(&mut self, lifetime: Lifetime) -> Result<usize, LifetimeError> {
        Ok(self.list_mut(lifetime)?.reset())
    }

    /// How many times `lifetime` has been reset.
    pub fn epoch(&self, lifetime: Lifetime) -> u64 {
        self.list(lifetime).map_or(0, PageList::epoch)
    }

    /// The page list of `lifetime`.
    pub fn list(&self, lifetime: Lifetime) -> Option<&PageList> {
        self.lists.get(lifetime.index())
    }

    fn list_mut(&mut self, lifetime: Lifetime) -> Result<&mut PageList, LifetimeError> {
        self.lists
            .get_mut(lifetime.index())
            .ok_or(LifetimeError::NotLive(lifetime))
    }

    /// Bytes in use across every lifetime.
    pub fn used_bytes(&self) -> usize {
        self.lists.iter().map(PageList::used_bytes).sum()
    }

    /// Which lifetime owns the page containing `addr`, if any.
    pub fn owner_of(&self, addr: usize) -> Option<Lifetime> {
        self.lists.iter().enumerate().find_map(|(index, list)| {
            list.pages()
                .iter()
                .any(|page| page.contains(addr))
                .then(|| Lifetime::from_index(index))
        })
    }
}
