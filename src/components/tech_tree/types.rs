use std::cell::RefCell;
use std::rc::Rc;

use crate::tree::ProgressStore;

/// The one progress store, handed explicitly to every component that reads
/// or edits progress.
pub type SharedProgress = Rc<RefCell<ProgressStore>>;

pub fn share(store: ProgressStore) -> SharedProgress {
	Rc::new(RefCell::new(store))
}
