mod session_streams_test;
