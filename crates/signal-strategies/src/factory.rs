//! Strategy factory.
//!
//! Maps strategy type keys to constructors and default configurations,
//! creates fully initialized instances, and exclusively owns the table of
//! live instances. Static per-type metadata is available for operator-facing
//! listings without touching any live instance.

use crate::{
    BreakoutConfig, BreakoutStrategy, GridConfig, GridStrategy, MeanReversionConfig,
    MeanReversionStrategy, TrendConfig, TrendStrategy,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use signal_core::{
    error::StrategyError,
    traits::{MarketData, SignalSink, Strategy, TradeStore},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Broad risk classification of a strategy type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Static metadata describing one strategy type.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDescriptor {
    /// Type key accepted by [`StrategyFactory::create`]
    pub kind: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Market conditions the type is suited to
    pub market_conditions: &'static str,
    pub risk_tier: RiskTier,
}

/// Known strategy types.
pub const DESCRIPTORS: &[StrategyDescriptor] = &[
    StrategyDescriptor {
        kind: "grid",
        display_name: "Grid",
        description: "Trades crossings of equally spaced levels over a fixed price range",
        market_conditions: "Range-bound, sideways markets",
        risk_tier: RiskTier::Low,
    },
    StrategyDescriptor {
        kind: "trend_following",
        display_name: "Trend Following",
        description: "Signals in the direction of a confirmed moving-average or MACD trend",
        market_conditions: "Sustained directional markets",
        risk_tier: RiskTier::Medium,
    },
    StrategyDescriptor {
        kind: "mean_reversion",
        display_name: "Mean Reversion",
        description: "Fades stretches away from the rolling mean and exits on reversion",
        market_conditions: "Oscillating markets without a strong trend",
        risk_tier: RiskTier::Medium,
    },
    StrategyDescriptor {
        kind: "breakout",
        display_name: "Breakout",
        description: "Signals when price clears support or resistance with confirmation",
        market_conditions: "Consolidation followed by expansion, high-volume moves",
        risk_tier: RiskTier::High,
    },
];

/// Creates strategy instances and owns the table of live ones.
pub struct StrategyFactory {
    market: Arc<dyn MarketData>,
    sink: Option<Arc<dyn SignalSink>>,
    trades: Option<Arc<dyn TradeStore>>,
    instances: RwLock<HashMap<String, Arc<dyn Strategy>>>,
    sequence: AtomicU64,
}

impl StrategyFactory {
    pub fn new(
        market: Arc<dyn MarketData>,
        sink: Option<Arc<dyn SignalSink>>,
        trades: Option<Arc<dyn TradeStore>>,
    ) -> Self {
        Self {
            market,
            sink,
            trades,
            instances: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Metadata for every known strategy type.
    pub fn descriptors() -> &'static [StrategyDescriptor] {
        DESCRIPTORS
    }

    /// Metadata for one type key, if known.
    pub fn descriptor(kind: &str) -> Option<&'static StrategyDescriptor> {
        DESCRIPTORS.iter().find(|d| d.kind == kind)
    }

    /// Create, initialize and register a strategy instance.
    ///
    /// `overrides` is merged shallowly over the type's default configuration.
    /// An unknown `kind` fails immediately; so does a configuration the
    /// variant rejects during initialization.
    pub async fn create(
        &self,
        kind: &str,
        overrides: serde_json::Value,
    ) -> Result<Arc<dyn Strategy>, StrategyError> {
        let id = self.next_id(kind);

        let strategy: Arc<dyn Strategy> = match kind {
            "grid" => {
                let config: GridConfig = merge_config(GridConfig::default(), overrides)?;
                Arc::new(GridStrategy::new(
                    id.clone(),
                    config,
                    Arc::clone(&self.market),
                    self.sink.clone(),
                    self.trades.clone(),
                ))
            }
            "trend_following" => {
                let config: TrendConfig = merge_config(TrendConfig::default(), overrides)?;
                Arc::new(TrendStrategy::new(
                    id.clone(),
                    config,
                    Arc::clone(&self.market),
                    self.sink.clone(),
                    self.trades.clone(),
                ))
            }
            "mean_reversion" => {
                let config: MeanReversionConfig =
                    merge_config(MeanReversionConfig::default(), overrides)?;
                Arc::new(MeanReversionStrategy::new(
                    id.clone(),
                    config,
                    Arc::clone(&self.market),
                    self.sink.clone(),
                    self.trades.clone(),
                ))
            }
            "breakout" => {
                let config: BreakoutConfig = merge_config(BreakoutConfig::default(), overrides)?;
                Arc::new(BreakoutStrategy::new(
                    id.clone(),
                    config,
                    Arc::clone(&self.market),
                    self.sink.clone(),
                    self.trades.clone(),
                ))
            }
            _ => return Err(StrategyError::UnknownType(kind.to_string())),
        };

        strategy.initialize().await?;
        self.instances
            .write()
            .await
            .insert(id.clone(), Arc::clone(&strategy));

        info!(%id, %kind, "strategy created");
        Ok(strategy)
    }

    /// Look up a live instance by id.
    pub async fn get(&self, id: &str) -> Option<Arc<dyn Strategy>> {
        self.instances.read().await.get(id).cloned()
    }

    /// All live instances.
    pub async fn list(&self) -> Vec<Arc<dyn Strategy>> {
        self.instances.read().await.values().cloned().collect()
    }

    /// Number of live instances.
    pub async fn active_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Dispose an instance and remove it from the table.
    pub async fn destroy(&self, id: &str) -> Result<(), StrategyError> {
        let strategy = self
            .instances
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StrategyError::NotFound(id.to_string()))?;
        strategy.dispose().await;
        info!(%id, "strategy destroyed");
        Ok(())
    }

    /// Dispose every instance and clear the table.
    pub async fn destroy_all(&self) {
        let drained: Vec<_> = self.instances.write().await.drain().collect();
        for (id, strategy) in drained {
            strategy.dispose().await;
            info!(%id, "strategy destroyed");
        }
    }

    fn next_id(&self, kind: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", kind, Utc::now().timestamp_millis(), seq)
    }
}

/// Merge caller-supplied JSON fields over a default configuration.
///
/// Only top-level object fields are replaced; `null` leaves the defaults
/// untouched.
fn merge_config<T>(default: T, overrides: serde_json::Value) -> Result<T, StrategyError>
where
    T: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(&default)
        .map_err(|e| StrategyError::Internal(e.to_string()))?;

    match overrides {
        serde_json::Value::Null => {}
        serde_json::Value::Object(fields) => {
            let target = base
                .as_object_mut()
                .ok_or_else(|| StrategyError::Internal("default config is not an object".into()))?;
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        other => {
            return Err(StrategyError::InvalidConfig(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    }

    serde_json::from_value(base).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use signal_core::error::DataError;
    use signal_core::traits::StrategyStatus;
    use signal_core::types::{Candle, Timeframe};
    use serde_json::json;

    struct FlatMarket;

    #[async_trait]
    impl MarketData for FlatMarket {
        async fn quote(&self, _symbol: &str) -> Result<f64, DataError> {
            Ok(100.0)
        }

        async fn candles(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            count: usize,
        ) -> Result<Vec<Candle>, DataError> {
            Ok((0..count)
                .map(|i| Candle::new(i as i64 * 60_000, 100.0, 100.5, 99.5, 100.0, 1000.0))
                .collect())
        }
    }

    fn factory() -> StrategyFactory {
        StrategyFactory::new(Arc::new(FlatMarket), None, None)
    }

    #[tokio::test]
    async fn test_create_initializes_and_registers() {
        let factory = factory();
        let strategy = factory
            .create("grid", json!({"symbols": ["BTCUSDT"]}))
            .await
            .unwrap();

        assert!(strategy.id().starts_with("grid-"));
        assert_eq!(strategy.kind(), "grid");
        assert_eq!(strategy.status().await, StrategyStatus::Active);
        assert_eq!(factory.active_count().await, 1);
        assert!(factory.get(strategy.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_type_fails_fast() {
        let factory = factory();
        let result = factory.create("martingale", json!({})).await;

        assert!(matches!(result, Err(StrategyError::UnknownType(_))));
        assert_eq!(factory.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let factory = factory();
        // Default symbol list is empty; initialization must reject it.
        let result = factory.create("grid", json!({})).await;

        assert!(matches!(result, Err(StrategyError::InvalidConfig(_))));
        assert_eq!(factory.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_overrides_merge_over_defaults() {
        let factory = factory();
        let strategy = factory
            .create(
                "trend_following",
                json!({"symbols": ["ETHUSDT"], "confirmation_candles": 1}),
            )
            .await
            .unwrap();

        assert_eq!(strategy.symbols().await, vec!["ETHUSDT".to_string()]);
    }

    #[tokio::test]
    async fn test_non_object_overrides_rejected() {
        let factory = factory();
        let result = factory.create("grid", json!([1, 2, 3])).await;
        assert!(matches!(result, Err(StrategyError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_destroy_disposes_and_removes() {
        let factory = factory();
        let strategy = factory
            .create("breakout", json!({"symbols": ["BTCUSDT"]}))
            .await
            .unwrap();
        let id = strategy.id().to_string();

        factory.destroy(&id).await.unwrap();
        assert_eq!(strategy.status().await, StrategyStatus::Disposed);
        assert_eq!(factory.active_count().await, 0);
        assert!(factory.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_destroy_unknown_id() {
        let factory = factory();
        let result = factory.destroy("grid-0-0").await;
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_destroy_all() {
        let factory = factory();
        for kind in ["grid", "mean_reversion", "breakout"] {
            factory
                .create(kind, json!({"symbols": ["BTCUSDT"]}))
                .await
                .unwrap();
        }
        assert_eq!(factory.active_count().await, 3);

        factory.destroy_all().await;
        assert_eq!(factory.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let factory = factory();
        let a = factory
            .create("grid", json!({"symbols": ["BTCUSDT"]}))
            .await
            .unwrap();
        let b = factory
            .create("grid", json!({"symbols": ["BTCUSDT"]}))
            .await
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_descriptors_cover_all_kinds() {
        let kinds: Vec<_> = StrategyFactory::descriptors()
            .iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            vec!["grid", "trend_following", "mean_reversion", "breakout"]
        );
        assert!(StrategyFactory::descriptor("grid").is_some());
        assert!(StrategyFactory::descriptor("martingale").is_none());
    }
}
