pub mod file_handler;

pub use file_handler::{
    __path_create_file, __path_create_import, __path_delete_file, __path_get_file,
    __path_list_files, __path_update_file, create_file, create_import, delete_file, get_file,
    import_form, list_files, new_file_form, update_file, FilesState,
};
