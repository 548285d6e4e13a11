pub mod outline_annotator;
