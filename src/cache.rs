use std::num::NonZeroUsize;

use log::warn;
use lru::LruCache;

use crate::{param::DEFAULT_CACHE_CAPACITY, router::RouteMatch};

/// 缓存中保存的匹配结果，`None` 表示该路径已确认未命中任何路由
pub type CachedMatch = Option<RouteMatch>;

pub struct MatchCache {
    cache: LruCache<String, CachedMatch>,
}

impl MatchCache {
    // 根据容量构造
    pub fn from_capacity(capacity: usize) -> Self {
        let cap = match NonZeroUsize::new(capacity) {
            Some(cap) => cap,
            None => {
                warn!(
                    "匹配缓存容量被设置为0，如需禁用缓存请关闭匹配缓存，该值将被改为{}",
                    DEFAULT_CACHE_CAPACITY
                );
                NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)
            }
        };
        Self {
            cache: LruCache::new(cap),
        }
    }

    // 缓存键：大写方法名 + 空格 + 原始路径
    pub fn key(method: &str, path: &str) -> String {
        format!("{} {}", method, path)
    }

    // 放入，超出容量时淘汰最久未使用的记录
    pub fn push(&mut self, key: String, entry: CachedMatch) {
        self.cache.put(key, entry);
    }

    // 查询，命中时同时把记录移到最近使用的位置
    pub fn find(&mut self, key: &str) -> Option<CachedMatch> {
        self.cache.get(key).cloned()
    }

    // 注册新路由后整体失效
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
