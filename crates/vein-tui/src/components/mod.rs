pub mod archive_panel;
pub mod contact_panel;
pub mod header;
pub mod help_overlay;
pub mod menu_overlay;
pub mod player_bar;
pub mod project_detail;
pub mod project_list;
pub mod versatility_list;
