pub mod estimate_panel;
pub mod tech_tree;
