pub mod nodes;
pub mod xml;

pub use nodes::{extract_text_from_node, ElementIndex, ElementSpan};
pub use xml::{read_svg, save_svg, write_svg, SvgDocument, XmlEvent};
