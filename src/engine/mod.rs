pub mod classify;
pub mod export;
pub mod guard;
pub mod ledger;
pub mod model;
pub mod normalize;
pub mod reconcile;

pub use classify::{Classified, Classifier, FeeEstimator};
pub use export::{statement_rows, write_statement_csv, StatementRow};
pub use guard::GuardFinding;
pub use ledger::{month_bounds, LedgerBuilder, SettlementWindow};
pub use model::{
    BucketTotals, KindTotals, LedgerLine, MonthlyStatement, PayoutReconciliation, SourceRef,
    Transaction, TxKind, TxStatus,
};
pub use normalize::{Normalizer, RowCandidate};
pub use reconcile::build_payout_reconciliation;
