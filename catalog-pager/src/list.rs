use core::sync::atomic::{AtomicU64, Ordering};

use crate::strategy::PageFuture;
use crate::{FetchError, FetchResult, ListPhase, Page, PageStrategy};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`InfiniteList`] instance. A list rebuilt for another filter gets a new id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListId(u64);

impl ListId {
    fn next() -> Self {
        Self(NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A page request issued by an [`InfiniteList`].
///
/// The ticket must be handed back to [`InfiniteList::complete`] together with the fetch result;
/// tickets from another list or from a superseded request are ignored there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageTicket<P> {
    list: ListId,
    seq: u64,
    param: P,
    first: bool,
}

impl<P> PageTicket<P> {
    pub fn list(&self) -> ListId {
        self.list
    }

    pub fn param(&self) -> &P {
        &self.param
    }

    pub fn is_first_page(&self) -> bool {
        self.first
    }
}

/// Outcome of [`InfiniteList::complete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The page was appended; `len` is its item count.
    Appended { len: usize },
    /// The ticket did not belong to the current request; nothing changed.
    Ignored,
}

/// The incremental list accumulator: pages fetched so far for one logical list.
///
/// State machine: `Idle → LoadingFirst → Ready ⇄ LoadingNext`, and `Exhausted` as soon as the
/// strategy reports no further page. Pages are append-only and the flattened item sequence
/// always has exactly the items of every page, in arrival order.
///
/// The list is driven either with the async helpers (`start`, `fetch_next_page`) or, when the
/// caller owns the I/O, with `begin_*` / [`Self::fetch`] / [`Self::complete`].
#[derive(Clone, Debug)]
pub struct InfiniteList<S: PageStrategy> {
    id: ListId,
    strategy: S,
    pages: Vec<Page<S::Item>>,
    items: Vec<S::Item>,
    phase: ListPhase,
    next_param: Option<S::Param>,
    in_flight: Option<u64>,
    next_seq: u64,
    last_error: Option<FetchError>,
}

impl<S: PageStrategy> InfiniteList<S> {
    pub fn new(strategy: S) -> Self {
        let id = ListId::next();
        pdebug!(list = id.0, enabled = strategy.is_enabled(), "InfiniteList::new");
        Self {
            id,
            strategy,
            pages: Vec::new(),
            items: Vec::new(),
            phase: ListPhase::Idle,
            next_param: None,
            in_flight: None,
            next_seq: 0,
            last_error: None,
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    pub fn pages(&self) -> &[Page<S::Item>] {
        &self.pages
    }

    /// Items of every page, in append order.
    pub fn items(&self) -> &[S::Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Collection size reported by the most recent page (0 before the first page).
    pub fn total(&self) -> usize {
        self.pages.last().map_or(0, |page| page.total)
    }

    pub fn has_next_page(&self) -> bool {
        self.next_param.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.phase == ListPhase::LoadingNext
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == ListPhase::Exhausted
    }

    pub fn is_enabled(&self) -> bool {
        self.strategy.is_enabled()
    }

    /// The error of the last failed request, cleared by the next success.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    fn issue(&mut self, param: S::Param, first: bool) -> PageTicket<S::Param> {
        let seq = self.next_seq;
        self.next_seq = seq.wrapping_add(1);
        self.in_flight = Some(seq);
        self.phase = if first {
            ListPhase::LoadingFirst
        } else {
            ListPhase::LoadingNext
        };
        ptrace!(list = self.id.0, seq, first, param = ?param, "page requested");
        PageTicket {
            list: self.id,
            seq,
            param,
            first,
        }
    }

    /// `Idle → LoadingFirst`. Returns `None` when already started or the strategy is disabled.
    pub fn begin_first_page(&mut self) -> Option<PageTicket<S::Param>> {
        if self.phase != ListPhase::Idle || !self.strategy.is_enabled() {
            return None;
        }
        let param = self.strategy.initial_param();
        Some(self.issue(param, true))
    }

    /// `Ready → LoadingNext`, only when a next page exists and nothing is in flight.
    pub fn begin_next_page(&mut self) -> Option<PageTicket<S::Param>> {
        if self.phase != ListPhase::Ready || self.in_flight.is_some() {
            return None;
        }
        let param = self.next_param.clone()?;
        Some(self.issue(param, false))
    }

    /// The fetch for `ticket`. The returned future does not borrow the list.
    pub fn fetch(&self, ticket: &PageTicket<S::Param>) -> PageFuture<S::Item> {
        self.strategy.fetch_page(&ticket.param)
    }

    /// Applies the result of the request identified by `ticket`.
    ///
    /// On success the page is appended and the next request is computed. On failure the list
    /// returns to the phase it had before the request and the error is surfaced; nothing is
    /// appended.
    pub fn complete(
        &mut self,
        ticket: &PageTicket<S::Param>,
        result: FetchResult<Page<S::Item>>,
    ) -> FetchResult<Completion> {
        if ticket.list != self.id || self.in_flight != Some(ticket.seq) {
            pdebug!(
                list = self.id.0,
                ticket_list = ticket.list.0,
                seq = ticket.seq,
                "dropping stale page response"
            );
            return Ok(Completion::Ignored);
        }
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.phase = if ticket.first {
                    ListPhase::Idle
                } else {
                    ListPhase::Ready
                };
                pwarn!(list = self.id.0, error = %err, "page request failed");
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        let len = page.len();
        self.items.extend(page.items.iter().cloned());
        self.pages.push(page);
        self.last_error = None;
        self.next_param = self.strategy.next_param(&self.pages);
        self.phase = if self.next_param.is_some() {
            ListPhase::Ready
        } else {
            ListPhase::Exhausted
        };
        ptrace!(
            list = self.id.0,
            len,
            loaded = self.items.len(),
            phase = ?self.phase,
            "page appended"
        );
        Ok(Completion::Appended { len })
    }

    /// Releases a request that will never be completed, returning the list to the phase it had
    /// before the request. Returns `false` when `ticket` is not the current request.
    pub fn cancel(&mut self, ticket: &PageTicket<S::Param>) -> bool {
        if ticket.list != self.id || self.in_flight != Some(ticket.seq) {
            return false;
        }
        self.in_flight = None;
        self.phase = if ticket.first {
            ListPhase::Idle
        } else {
            ListPhase::Ready
        };
        pdebug!(list = self.id.0, seq = ticket.seq, "page request cancelled");
        true
    }

    async fn run(&mut self, ticket: PageTicket<S::Param>) -> FetchResult<bool> {
        let fetch = self.fetch(&ticket);
        let pending = PendingPage {
            list: self,
            ticket,
            settled: false,
        };
        let result = fetch.await;
        let completion = pending.settle(result)?;
        Ok(completion != Completion::Ignored)
    }

    /// Loads the first page. Returns `false` when the list was not `Idle` or is disabled.
    pub async fn start(&mut self) -> FetchResult<bool> {
        match self.begin_first_page() {
            Some(ticket) => self.run(ticket).await,
            None => Ok(false),
        }
    }

    /// Loads the next page (the first one if the list has not started yet).
    ///
    /// Returns `false` without fetching when there is no next page or a request is already in
    /// flight.
    pub async fn fetch_next_page(&mut self) -> FetchResult<bool> {
        if self.phase == ListPhase::Idle {
            return self.start().await;
        }
        match self.begin_next_page() {
            Some(ticket) => self.run(ticket).await,
            None => Ok(false),
        }
    }
}

/// Cancels its request on drop unless it was settled, so a dropped `start` or
/// `fetch_next_page` future leaves the list ready for another attempt.
struct PendingPage<'a, S: PageStrategy> {
    list: &'a mut InfiniteList<S>,
    ticket: PageTicket<S::Param>,
    settled: bool,
}

impl<S: PageStrategy> PendingPage<'_, S> {
    fn settle(mut self, result: FetchResult<Page<S::Item>>) -> FetchResult<Completion> {
        self.settled = true;
        self.list.complete(&self.ticket, result)
    }
}

impl<S: PageStrategy> Drop for PendingPage<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            self.list.cancel(&self.ticket);
        }
    }
}
