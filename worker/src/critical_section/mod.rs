pub mod critical_section_buffer;
