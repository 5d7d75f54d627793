// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由引擎
//!
//! 将 `(method, path)` 映射到已注册的路由，并提取路径参数。
//!
//! ## 路由规则：
//! 1. 每个 HTTP 方法拥有一棵独立的前缀树（Trie），键为路径段。
//! 2. 同一深度下优先尝试静态段，其次是参数段 `:name`，最后是通配段 `*name`。
//! 3. 通配段至少吞掉一个路径段，从最长到最短依次尝试，因此通配段之后仍可继续匹配。
//! 4. 只有恰好在路径段末尾到达终止节点时才算匹配成功，返回该节点上第一条路由。
//!
//! ## 并发模型：
//! - 前缀树放在 `RwLock` 中，注册取写锁，匹配取读锁。
//! - 匹配缓存放在 `Mutex` 中，命中时更新最近使用顺序；锁被污染时恢复并继续。
//! - 缓存写入发生在持有前缀树读锁期间，注册在持有写锁期间清空缓存，
//!   因此缓存里不会留下注册之前算出的旧结果。

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use log::{debug, warn};
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::{
    cache::MatchCache,
    handler::Handler,
    param::*,
};

/// 已注册的路由，注册后不可变，生命周期与进程相同
pub struct Route {
    method: String,
    path: String,
    path_pattern: String,
    handler: Arc<dyn Handler>,
    metadata: HashMap<String, Value>,
    /// 按出现顺序排列的参数段与通配段名称
    capture_names: Vec<String>,
}

impl Route {
    pub(crate) fn from_definition(definition: RouteDefinition) -> Self {
        let method = normalize_method(&definition.method);
        let path_pattern = definition
            .path_pattern
            .unwrap_or_else(|| definition.path.clone());
        let capture_names = parse_pattern(&path_pattern)
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Static(_) => None,
                Segment::Param(name) | Segment::Wildcard(name) => Some(name.to_string()),
            })
            .collect();
        Self {
            method,
            path: definition.path,
            path_pattern,
            handler: definition.handler,
            metadata: definition.metadata,
            capture_names,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// 对外展示的路径（例如写入文档）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 实际参与匹配的路径模式
    pub fn path_pattern(&self) -> &str {
        &self.path_pattern
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("path_pattern", &self.path_pattern)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// 注册路由时的输入
pub struct RouteDefinition {
    method: String,
    path: String,
    path_pattern: Option<String>,
    handler: Arc<dyn Handler>,
    metadata: HashMap<String, Value>,
}

impl RouteDefinition {
    pub fn new(method: &str, path: &str, handler: impl Handler + 'static) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            path_pattern: None,
            handler: Arc::new(handler),
            metadata: HashMap::new(),
        }
    }

    /// 使用与 `path` 不同的匹配模式
    pub fn pattern(mut self, path_pattern: &str) -> Self {
        self.path_pattern = Some(path_pattern.to_string());
        self
    }

    /// 附加任意元数据，核心不会读取这些值
    pub fn metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// 一次成功匹配的结果
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: HashMap<String, String>,
    pub route_pattern: String,
}

/// `register` 的返回值
#[derive(Debug, Clone)]
pub struct RouteRegistration {
    pub route: Arc<Route>,
    /// 注册完成后的路由版本号
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard(&'a str),
}

struct NamedChild {
    name: String,
    node: TrieNode,
}

#[derive(Default)]
struct TrieNode {
    static_children: HashMap<String, TrieNode>,
    param_child: Option<Box<NamedChild>>,
    wildcard_child: Option<Box<NamedChild>>,
    terminal_routes: Vec<Arc<Route>>,
}

impl TrieNode {
    fn insert(&mut self, segments: &[Segment], route: Arc<Route>) {
        let mut node = self;
        for segment in segments {
            node = match *segment {
                Segment::Static(text) => node.static_children.entry(text.to_string()).or_default(),
                Segment::Param(name) => {
                    &mut named_child(&mut node.param_child, name, &route.path_pattern).node
                }
                Segment::Wildcard(name) => {
                    &mut named_child(&mut node.wildcard_child, name, &route.path_pattern).node
                }
            };
        }
        node.terminal_routes.push(route);
    }

    /// 回溯匹配：静态段 -> 参数段 -> 通配段（由长到短）
    fn walk(&self, segments: &[&str], index: usize, captures: &mut Vec<String>) -> Option<&Arc<Route>> {
        if index == segments.len() {
            return self.terminal_routes.first();
        }

        if let Some(child) = self.static_children.get(segments[index]) {
            if let Some(route) = child.walk(segments, index + 1, captures) {
                return Some(route);
            }
        }

        if let Some(param) = &self.param_child {
            captures.push(decode_segment(segments[index]));
            if let Some(route) = param.node.walk(segments, index + 1, captures) {
                return Some(route);
            }
            captures.pop();
        }

        if let Some(wildcard) = &self.wildcard_child {
            for end in (index + 1..=segments.len()).rev() {
                let joined = segments[index..end].join("/");
                captures.push(decode_segment(&joined));
                if let Some(route) = wildcard.node.walk(segments, end, captures) {
                    return Some(route);
                }
                captures.pop();
            }
        }

        None
    }
}

// 同一节点只有一个参数子节点（或通配子节点），名称以第一次注册为准
fn named_child<'a>(slot: &'a mut Option<Box<NamedChild>>, name: &str, pattern: &str) -> &'a mut NamedChild {
    let child = slot.get_or_insert_with(|| {
        Box::new(NamedChild {
            name: name.to_string(),
            node: TrieNode::default(),
        })
    });
    if child.name != name {
        warn!(
            "路由模式{}中的参数名{}与同一位置已有的参数名{}不一致，提取参数时将以各自路由的名称为准",
            pattern, name, child.name
        );
    }
    child
}

/// 拆分路径：去掉查询字符串和片段，忽略空段（因此结尾的 `/` 与重复的 `/` 都不影响匹配）
fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

fn parse_pattern(pattern: &str) -> Vec<Segment<'_>> {
    split_path(pattern)
        .into_iter()
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(PARAM_MARKER) {
                Segment::Param(name)
            } else if let Some(name) = segment.strip_prefix(WILDCARD_MARKER) {
                if name.is_empty() {
                    Segment::Wildcard(DEFAULT_WILDCARD_NAME)
                } else {
                    Segment::Wildcard(name)
                }
            } else {
                Segment::Static(segment)
            }
        })
        .collect()
}

fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// 路由表：每个方法一棵前缀树，外加有界的 LRU 匹配缓存
pub struct Router {
    roots: RwLock<HashMap<String, TrieNode>>,
    routes: RwLock<Vec<Arc<Route>>>,
    cache: Mutex<MatchCache>,
    cache_enabled: AtomicBool,
    version: AtomicU64,
}

impl Router {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            roots: RwLock::new(HashMap::new()),
            routes: RwLock::new(Vec::new()),
            cache: Mutex::new(MatchCache::from_capacity(capacity)),
            cache_enabled: AtomicBool::new(true),
            version: AtomicU64::new(0),
        }
    }

    /// 注册一条路由。重复的模式会被静默接受，匹配时返回先注册的那一条。
    pub fn register(&self, definition: RouteDefinition) -> RouteRegistration {
        let route = Arc::new(Route::from_definition(definition));
        let segments = parse_pattern(&route.path_pattern);

        let mut roots = self.write_roots();
        roots
            .entry(route.method.clone())
            .or_default()
            .insert(&segments, Arc::clone(&route));
        self.write_routes().push(Arc::clone(&route));

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock_cache().clear();
        drop(roots);

        debug!(
            "注册路由：{} {}（版本{}）",
            route.method, route.path_pattern, version
        );
        RouteRegistration { route, version }
    }

    /// `register` 的便捷形式
    pub fn route(&self, method: &str, path: &str, handler: impl Handler + 'static) -> RouteRegistration {
        self.register(RouteDefinition::new(method, path, handler))
    }

    /// 查找与 `(method, path)` 匹配的路由。未匹配不是错误，返回 `None`。
    pub fn match_route(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let method = normalize_method(method);
        let use_cache = self.cache_enabled.load(Ordering::Acquire);
        let key = MatchCache::key(&method, path);

        if use_cache {
            if let Some(cached) = self.lock_cache().find(&key) {
                return cached;
            }
        }

        let roots = self.read_roots();
        let segments = split_path(path);
        let mut captures = Vec::new();
        let result = roots.get(&method).and_then(|root| {
            root.walk(&segments, 0, &mut captures).map(|route| RouteMatch {
                route: Arc::clone(route),
                params: route
                    .capture_names
                    .iter()
                    .cloned()
                    .zip(captures.drain(..))
                    .collect(),
                route_pattern: route.path_pattern.clone(),
            })
        });

        if use_cache && self.cache_enabled.load(Ordering::Acquire) {
            self.lock_cache().push(key, result.clone());
        }
        drop(roots);

        result
    }

    /// 按注册顺序返回所有路由
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.read_routes().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// 关闭缓存时会同时清空，之后每次匹配都直接遍历前缀树
    pub fn set_match_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.lock_cache().clear();
        }
        debug!("匹配缓存已{}", if enabled { "启用" } else { "禁用" });
    }

    pub fn is_match_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Acquire)
    }

    /// 当前缓存条目数
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> MutexGuard<'_, MatchCache> {
        match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("匹配缓存锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    fn read_roots(&self) -> RwLockReadGuard<'_, HashMap<String, TrieNode>> {
        match self.roots.read() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("路由树读锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    fn write_roots(&self) -> RwLockWriteGuard<'_, HashMap<String, TrieNode>> {
        match self.roots.write() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("路由树写锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    fn read_routes(&self) -> RwLockReadGuard<'_, Vec<Arc<Route>>> {
        match self.routes.read() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_routes(&self) -> RwLockWriteGuard<'_, Vec<Arc<Route>>> {
        match self.routes.write() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
