mod document_tests;
