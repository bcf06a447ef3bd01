//! Catalog-backed search feature.
//!
//! One instance serves one domain. Each catalog source the domain is
//! searched on gets its own command id (`<domain tag><source>`), its own
//! result store and its own detail store. Opened entries page their related
//! works under a second command id, `<domain tag><source>D`.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::application::catalog::Catalog;
use crate::application::dispatcher::{FeatureHandler, Invocation};
use crate::application::error::{Delivery, FlowError};
use crate::application::navigator::Navigator;
use crate::application::transport::InteractionContext;
use crate::application::views::{self, DetailLayout, DetailSessions, ImagePolicy, ListLayout, View};
use crate::cache::{CacheStore, Expiring};
use crate::domain::catalog::CatalogItem;
use crate::domain::error::NavError;
use crate::domain::token::{CommandId, NavigationToken};
use crate::domain::types::{Behavior, Domain};

const SOURCE: &str = "application::features::search";

/// Option naming the search text.
pub const KEYWORD_OPTION: &str = "keyword";
/// Option selecting the catalog source; defaults to the first one.
pub const SOURCE_OPTION: &str = "source";

type ResultStore = CacheStore<String, Arc<Vec<CatalogItem>>>;
type DetailStore = CacheStore<String, Arc<CatalogItem>>;

/// Slash command that starts a search in `domain`.
pub fn command_name(domain: Domain) -> &'static str {
    match domain {
        Domain::Game => "search_game",
        Domain::Brand => "search_brand",
        Domain::Music => "search_music",
        Domain::Creator => "search_creator",
        Domain::Character => "search_character",
    }
}

fn heading(domain: Domain) -> &'static str {
    match domain {
        Domain::Game => "Game search",
        Domain::Brand => "Brand search",
        Domain::Music => "Music search",
        Domain::Creator => "Creator search",
        Domain::Character => "Character search",
    }
}

fn store_names(domain: Domain) -> (&'static str, &'static str) {
    match domain {
        Domain::Game => ("game_results", "game_details"),
        Domain::Brand => ("brand_results", "brand_details"),
        Domain::Music => ("music_results", "music_details"),
        Domain::Creator => ("creator_results", "creator_details"),
        Domain::Character => ("character_results", "character_details"),
    }
}

/// Sizing shared by every search feature.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub page_size: usize,
    pub ttl: Duration,
    pub result_capacity: NonZeroUsize,
}

struct SourceStores {
    command_id: CommandId,
    detail_command_id: CommandId,
    results: Arc<ResultStore>,
    details: Arc<DetailStore>,
}

pub struct SearchFeature {
    domain: Domain,
    sources: BTreeMap<char, SourceStores>,
    default_source: char,
    catalog: Arc<dyn Catalog>,
    navigator: Navigator,
    images: Arc<ImagePolicy>,
    page_size: usize,
}

impl SearchFeature {
    /// Build a feature searching `domain` on `sources`, the first of which is
    /// the default.
    pub fn new(
        domain: Domain,
        sources: &[char],
        catalog: Arc<dyn Catalog>,
        navigator: Navigator,
        images: Arc<ImagePolicy>,
        settings: SearchSettings,
    ) -> Result<Self, NavError> {
        let Some(&default_source) = sources.first() else {
            return Err(NavError::unknown_command(format!(
                "{domain} search has no catalog source"
            )));
        };

        let (results_name, details_name) = store_names(domain);
        let mut stores = BTreeMap::new();
        for &source in sources {
            let command_id = CommandId::parse(&format!("{}{source}", domain.tag()))?;
            let detail_command_id = CommandId::parse(&format!("{command_id}D"))?;
            stores.insert(
                source,
                SourceStores {
                    command_id,
                    detail_command_id,
                    results: Arc::new(CacheStore::new(
                        results_name,
                        settings.ttl,
                        settings.result_capacity,
                    )),
                    details: Arc::new(CacheStore::new(
                        details_name,
                        settings.ttl,
                        settings.result_capacity,
                    )),
                },
            );
        }

        Ok(Self {
            domain,
            sources: stores,
            default_source,
            catalog,
            navigator,
            images,
            page_size: settings.page_size,
        })
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Every store owned by the feature, for the expiry sweeper.
    pub fn stores(&self) -> Vec<Arc<dyn Expiring>> {
        self.sources
            .values()
            .flat_map(|stores| {
                [
                    stores.results.clone() as Arc<dyn Expiring>,
                    stores.details.clone() as Arc<dyn Expiring>,
                ]
            })
            .collect()
    }

    async fn search(
        &self,
        ctx: &InteractionContext,
        options: &BTreeMap<String, String>,
    ) -> Result<Delivery, FlowError> {
        let keyword = options
            .get(KEYWORD_OPTION)
            .map(|keyword| keyword.trim())
            .unwrap_or_default();
        if keyword.is_empty() {
            self.navigator
                .transport()
                .acknowledge_immediate(
                    ctx,
                    View::notice(heading(self.domain), "Please give a keyword to search for."),
                )
                .await
                .map_err(FlowError::immediate)?;
            return Ok(Delivery::Immediate);
        }

        let source = options
            .get(SOURCE_OPTION)
            .and_then(|source| source.chars().next())
            .filter(|source| self.sources.contains_key(source))
            .unwrap_or(self.default_source);
        let Some(stores) = self.sources.get(&source) else {
            return Err(FlowError::immediate(NavError::unknown_command(
                command_name(self.domain),
            )));
        };

        let layout = self.layout(ctx, &stores.command_id);
        let catalog = Arc::clone(&self.catalog);
        let domain = self.domain;
        self.navigator
            .search_list(
                ctx,
                &stores.command_id,
                keyword,
                stores.results.as_ref(),
                || async move {
                    catalog
                        .search(domain, source, keyword)
                        .await
                        .map(Arc::new)
                        .map_err(NavError::from)
                },
                |items: &Arc<Vec<CatalogItem>>, page, handle| {
                    views::result_list(&layout, items, page, handle)
                },
            )
            .await
    }

    async fn navigate(
        &self,
        ctx: &InteractionContext,
        token: &NavigationToken,
    ) -> Result<Delivery, FlowError> {
        let command_id = token.command_id();
        let Some((&source, stores)) = self.sources.iter().find(|(_, stores)| {
            stores.command_id == *command_id || stores.detail_command_id == *command_id
        }) else {
            debug!(target: SOURCE, command_id = %command_id, "Token names no source of this feature");
            return Err(FlowError::immediate(NavError::unknown_command(
                command_id.as_str(),
            )));
        };

        let catalog = Arc::clone(&self.catalog);
        let domain = self.domain;
        let fetch_entry = |id: String| async move {
            match catalog.get(domain, source, &id).await {
                Ok(Some(item)) => Ok(Arc::new(item)),
                Ok(None) => Err(NavError::upstream(format!(
                    "no {domain} entry with id `{id}`"
                ))),
                Err(err) => Err(NavError::from(err)),
            }
        };
        let detail_layout = DetailLayout {
            command_id: &stores.command_id,
            detail_command_id: &stores.detail_command_id,
            images: &self.images,
            ctx,
        };
        let build_detail = |item: &Arc<CatalogItem>, page: u32, list: &str, entry: &str| {
            views::detail(&detail_layout, item, page, DetailSessions { list, entry })
        };

        if stores.detail_command_id == *command_id {
            return self
                .navigator
                .change_detail_page(ctx, token, stores.details.as_ref(), fetch_entry, build_detail)
                .await;
        }

        let layout = self.layout(ctx, &stores.command_id);
        let build_list = |items: &Arc<Vec<CatalogItem>>, page: u32, handle: &str| {
            views::result_list(&layout, items, page, handle)
        };

        match token.behavior() {
            Behavior::Page => {
                self.navigator
                    .change_page(ctx, token, stores.results.as_ref(), build_list)
                    .await
            }
            Behavior::BackToHome => {
                self.navigator
                    .back_to_home(ctx, token, stores.results.as_ref(), build_list)
                    .await
            }
            Behavior::SelectMenu | Behavior::DetailButton => {
                self.navigator
                    .show_detail(ctx, token, stores.details.as_ref(), fetch_entry, build_detail)
                    .await
            }
        }
    }

    fn layout<'a>(
        &'a self,
        ctx: &'a InteractionContext,
        command_id: &'a CommandId,
    ) -> ListLayout<'a> {
        ListLayout {
            command_id,
            heading: heading(self.domain),
            page_size: self.page_size,
            images: &self.images,
            ctx,
        }
    }
}

#[async_trait]
impl FeatureHandler for SearchFeature {
    async fn handle(
        &self,
        ctx: &InteractionContext,
        invocation: Invocation,
    ) -> Result<Delivery, FlowError> {
        match invocation {
            Invocation::New { options, .. } => self.search(ctx, &options).await,
            Invocation::Navigate(token) => self.navigate(ctx, &token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ReplyChannel;
    use crate::application::test_support::{CountingCatalog, RecordingTransport, Sent};
    use crate::application::views::Block;
    use crate::cache::SessionIndex;

    struct Harness {
        feature: SearchFeature,
        catalog: Arc<CountingCatalog>,
        transport: Arc<RecordingTransport>,
    }

    fn harness(item_count: usize) -> Harness {
        let capacity = NonZeroUsize::new(64).expect("non-zero");
        let ttl = Duration::from_secs(60);
        let catalog = Arc::new(CountingCatalog::with_characters(item_count));
        let transport = Arc::new(RecordingTransport::default());
        let navigator = Navigator::new(
            Arc::new(SessionIndex::new(ttl, capacity)),
            transport.clone(),
            Duration::from_secs(5),
        );
        let images = Arc::new(ImagePolicy::new(
            ["g-allowed".to_string()],
            "https://img.invalid/placeholder.gif".to_string(),
        ));
        let feature = SearchFeature::new(
            Domain::Character,
            &['1', '2'],
            catalog.clone(),
            navigator,
            images,
            SearchSettings {
                page_size: 10,
                ttl,
                result_capacity: capacity,
            },
        )
        .expect("feature");
        Harness {
            feature,
            catalog,
            transport,
        }
    }

    fn search(keyword: &str) -> Invocation {
        Invocation::New {
            command: command_name(Domain::Character).to_string(),
            options: BTreeMap::from([(KEYWORD_OPTION.to_string(), keyword.to_string())]),
        }
    }

    fn select_menu_token(view: &View) -> NavigationToken {
        view.blocks
            .iter()
            .find_map(|block| match block {
                Block::SelectMenu { custom_id, .. } => Some(custom_id.as_str()),
                _ => None,
            })
            .and_then(|id| match crate::domain::token::decode(id) {
                Ok(crate::domain::token::DecodedToken::Compact(token)) => Some(token),
                _ => None,
            })
            .expect("select menu token")
    }

    #[tokio::test]
    async fn blank_keyword_gets_an_immediate_notice() {
        let h = harness(3);
        let delivery = h
            .feature
            .handle(&InteractionContext::new("1", "u"), search("   "))
            .await
            .expect("notice");

        assert_eq!(delivery, Delivery::Immediate);
        assert_eq!(h.catalog.searches(), 0);
    }

    #[tokio::test]
    async fn unknown_source_option_falls_back_to_default() {
        let h = harness(3);
        let invocation = Invocation::New {
            command: command_name(Domain::Character).to_string(),
            options: BTreeMap::from([
                (KEYWORD_OPTION.to_string(), "char".to_string()),
                (SOURCE_OPTION.to_string(), "9".to_string()),
            ]),
        };

        h.feature
            .handle(&InteractionContext::new("1", "u"), invocation)
            .await
            .expect("search");

        let sent = h.transport.sent();
        let token = select_menu_token(sent[1].view().expect("edit"));
        assert_eq!(token.command_id().as_str(), "H1");
    }

    #[tokio::test]
    async fn selecting_an_entry_shows_its_detail_with_a_way_back() {
        let h = harness(3);
        let ctx = InteractionContext::new("1", "u").in_guild("g-allowed");
        h.feature.handle(&ctx, search("char")).await.expect("search");

        let list = h.transport.sent()[1].view().expect("edit").clone();
        let picked = select_menu_token(&list).with_value("h2").expect("pick");
        h.feature
            .handle(&InteractionContext::new("2", "u"), Invocation::Navigate(picked.clone()))
            .await
            .expect("detail");

        let sent = h.transport.sent();
        assert!(matches!(sent[2], Sent::Deferred { .. }));
        let detail = sent[3].view().expect("detail view");
        assert_eq!(detail.item_titles(), vec!["Character 2"]);
        assert_eq!(
            detail.custom_ids(),
            vec![
                NavigationToken::back_to_home("H1", picked.cache_id())
                    .expect("token")
                    .encode()
            ]
        );
        assert_eq!(h.catalog.gets(), 1);
    }

    #[tokio::test]
    async fn unknown_entry_is_an_upstream_failure() {
        let h = harness(3);
        let ctx = InteractionContext::new("1", "u");
        h.feature.handle(&ctx, search("char")).await.expect("search");

        let list = h.transport.sent()[1].view().expect("edit").clone();
        let picked = select_menu_token(&list).with_value("missing").expect("pick");
        let err = h
            .feature
            .handle(&ctx, Invocation::Navigate(picked))
            .await
            .expect_err("unknown id");

        assert_eq!(err.kind(), "upstream_fetch_failed");
        assert_eq!(err.channel, ReplyChannel::DeferredEdit);
    }

    #[tokio::test]
    async fn tokens_of_other_sources_are_unknown() {
        let h = harness(3);
        let token = NavigationToken::page("H3", "abc", 1).expect("token");

        let err = h
            .feature
            .handle(&InteractionContext::new("1", "u"), Invocation::Navigate(token))
            .await
            .expect_err("unknown source");
        assert_eq!(err.error, NavError::unknown_command("H3"));
    }

    #[tokio::test]
    async fn thumbnails_follow_the_allow_list() {
        let h = harness(1);
        h.feature
            .handle(&InteractionContext::new("1", "u").in_guild("g-allowed"), search("char"))
            .await
            .expect("allowed search");
        h.feature
            .handle(&InteractionContext::new("2", "u").in_guild("g-other"), search("char"))
            .await
            .expect("other search");

        let thumbnails: Vec<String> = h
            .transport
            .sent()
            .iter()
            .filter_map(Sent::view)
            .flat_map(|view| view.blocks.iter())
            .filter_map(|block| match block {
                Block::Item { thumbnail, .. } => Some(thumbnail.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            thumbnails,
            vec![
                "https://img.invalid/h0.jpg".to_string(),
                "https://img.invalid/placeholder.gif".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn list_entries_open_through_their_detail_buttons() {
        let h = harness(3);
        h.feature
            .handle(&InteractionContext::new("1", "u"), search("char"))
            .await
            .expect("search");

        let list = h.transport.sent()[1].view().expect("edit").clone();
        let buttons: Vec<NavigationToken> = list
            .custom_ids()
            .into_iter()
            .filter_map(|id| match crate::domain::token::decode(id) {
                Ok(crate::domain::token::DecodedToken::Compact(token))
                    if token.behavior() == Behavior::DetailButton =>
                {
                    Some(token)
                }
                _ => None,
            })
            .collect();
        let ids: Vec<&str> = buttons.iter().map(NavigationToken::value).collect();
        assert_eq!(ids, vec!["h0", "h1", "h2"]);

        h.feature
            .handle(
                &InteractionContext::new("2", "u"),
                Invocation::Navigate(buttons[1].clone()),
            )
            .await
            .expect("detail");
        let detail = h.transport.sent()[3].view().expect("detail view").clone();
        assert_eq!(detail.item_titles(), vec!["Character 1"]);
    }

    #[tokio::test]
    async fn detail_command_ids_route_to_entry_paging() {
        let h = harness(3);
        for command in ["H1D", "H2D"] {
            let token = NavigationToken::page(command, "gone", 2).expect("token");
            let err = h
                .feature
                .handle(&InteractionContext::new(command, "u"), Invocation::Navigate(token))
                .await
                .expect_err("no entry session");
            assert_eq!(err.error, NavError::SessionExpired);
            assert_eq!(err.channel, ReplyChannel::DeferredEdit);
        }

        let stray = NavigationToken::page("H3D", "gone", 2).expect("token");
        let err = h
            .feature
            .handle(&InteractionContext::new("3", "u"), Invocation::Navigate(stray))
            .await
            .expect_err("unknown source");
        assert_eq!(err.error, NavError::unknown_command("H3D"));
    }

    #[test]
    fn every_source_contributes_two_stores() {
        let h = harness(0);
        assert_eq!(h.feature.stores().len(), 4);
        assert_eq!(h.feature.domain(), Domain::Character);
    }
}
