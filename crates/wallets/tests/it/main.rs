mod reconcile;
mod selection;
mod session;
mod stats;
